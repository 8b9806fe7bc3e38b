use std::fmt;

/// Counters for one pipeline run.
///
/// Each stage fills its own copy; they are merged after the stages join.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    // Producer
    pub blocks_read: u64,
    pub bytes_read: u64,
    /// Frame or block errors that ended the stream early.
    pub read_errors: u64,

    // Consumers
    pub blocks_processed: u64,
    pub groups: u64,
    pub points: u64,
    pub paths: u64,
    pub restrictions: u64,
    /// Relations that are not turn restrictions.
    pub relations_skipped: u64,
    /// Plain-node groups skipped because plain nodes are disabled.
    pub node_groups_skipped: u64,
    pub hook_failures: u64,
    pub rejected_entities: u64,
    /// Blocks popped after a fatal error and released unprocessed.
    pub blocks_discarded: u64,

    // Teardown
    pub released_on_teardown: u64,
}

impl RunStats {
    pub fn merge(&mut self, other: &RunStats) {
        self.blocks_read += other.blocks_read;
        self.bytes_read += other.bytes_read;
        self.read_errors += other.read_errors;
        self.blocks_processed += other.blocks_processed;
        self.groups += other.groups;
        self.points += other.points;
        self.paths += other.paths;
        self.restrictions += other.restrictions;
        self.relations_skipped += other.relations_skipped;
        self.node_groups_skipped += other.node_groups_skipped;
        self.hook_failures += other.hook_failures;
        self.rejected_entities += other.rejected_entities;
        self.blocks_discarded += other.blocks_discarded;
        self.released_on_teardown += other.released_on_teardown;
    }

    /// Entities handed to the sink and accepted.
    #[must_use]
    pub fn entities(&self) -> u64 {
        self.points + self.paths + self.restrictions
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blocks={} groups={} points={} paths={} restrictions={} rejected={} hook_failures={}",
            self.blocks_processed,
            self.groups,
            self.points,
            self.paths,
            self.restrictions,
            self.rejected_entities,
            self.hook_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counters() {
        let mut a = RunStats {
            points: 3,
            blocks_read: 1,
            ..RunStats::default()
        };
        let b = RunStats {
            points: 2,
            paths: 4,
            released_on_teardown: 1,
            ..RunStats::default()
        };
        a.merge(&b);
        assert_eq!(a.points, 5);
        assert_eq!(a.paths, 4);
        assert_eq!(a.blocks_read, 1);
        assert_eq!(a.released_on_teardown, 1);
        assert_eq!(a.entities(), 9);
    }
}
