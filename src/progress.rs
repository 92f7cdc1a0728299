// src/progress.rs
/// Progress reporting for a multi-partition run.
/// Frontends implement this to surface status to users; every hook is optional.
pub trait Progress {
    /// Called at the start with the number of partitions.
    fn begin(&mut self, _partitions: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    fn partition_started(&mut self, _key: &str) {}

    /// One grid page read; `records` is what survived validation on it.
    fn page_done(&mut self, _key: &str, _page: usize, _records: usize) {}

    /// Partition finished, with its failure reason if it had one.
    fn partition_done(&mut self, _key: &str, _records: usize, _error: Option<&str>) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

