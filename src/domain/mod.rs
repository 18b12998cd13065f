// Domain layer: schedule data, calendar-facing models and ports (interfaces).

pub mod model;
pub mod ports;
pub mod rotation;
pub mod timetable;
