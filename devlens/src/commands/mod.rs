pub mod ctl;
pub mod run;
