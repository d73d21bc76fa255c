pub mod constants;
pub mod job_info;
