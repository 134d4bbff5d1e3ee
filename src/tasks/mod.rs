pub mod revert_sweeper;
