pub mod absence;
pub mod break_type;
pub mod clock_event;
pub mod company;
pub mod employee;
pub mod holiday;
pub mod role;
pub mod schedule;
pub mod vacation;
