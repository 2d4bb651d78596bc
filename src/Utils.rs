//! different utility modules used throughout the project
/// logger initialization and saving of comparison results into csv/json files
pub mod logger;
/// plots of the compared profiles and of their errors
pub mod plots;
/// tiny module for profiling (stage timers)
pub mod profiling;
/// tiny module to get system information - just a pretty-printing wrapper around famous sys-info crate (might be useful for performance monitoring)
pub mod sys_info;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
