pub mod evaluation_service;
pub mod grading_service;
