pub mod detail;
pub mod list;

pub use detail::{DetailEvent, DetailFields, DetailViewState};
pub use list::{ListEvent, ListViewState, TaskListObserver};
