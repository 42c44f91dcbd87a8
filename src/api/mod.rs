pub mod absence;
pub mod break_type;
pub mod clock;
pub mod company;
pub mod employee;
pub mod holiday;
pub mod report;
pub mod schedule;
pub mod vacation;
