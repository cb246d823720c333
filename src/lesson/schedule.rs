use std::collections::BTreeSet;

use crate::lesson::Checkpoint;

/// Derive the playable schedule for a video: the checkpoints not yet
/// completed, ascending by time. The sort is stable, so equal times keep
/// their authored order. Pure; callers re-derive whenever the checkpoint
/// list or the completed set changes.
pub fn derive(checkpoints: &[Checkpoint], completed: &BTreeSet<String>) -> Vec<Checkpoint> {
    let mut schedule: Vec<Checkpoint> = checkpoints
        .iter()
        .filter(|cp| !completed.contains(&cp.id))
        .cloned()
        .collect();
    schedule.sort_by_key(|cp| cp.time_seconds);
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::CheckpointType;

    fn cp(id: &str, time: u32) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            video_id: "vid".to_string(),
            time_seconds: time,
            kind: CheckpointType::Quiz,
            topic: format!("topic {id}"),
            question: format!("question {id}"),
        }
    }

    #[test]
    fn sorts_ascending_by_time() {
        let list = vec![cp("b", 300), cp("a", 120), cp("c", 900)];
        let schedule = derive(&list, &BTreeSet::new());
        let times: Vec<u32> = schedule.iter().map(|c| c.time_seconds).collect();
        assert_eq!(times, vec![120, 300, 900]);
    }

    #[test]
    fn excludes_completed_ids() {
        let list = vec![cp("a", 120), cp("b", 300), cp("c", 900)];
        let completed: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        let schedule = derive(&list, &completed);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].id, "b");
    }

    #[test]
    fn equal_times_keep_input_order() {
        let list = vec![cp("first", 60), cp("second", 60), cp("third", 60)];
        let schedule = derive(&list, &BTreeSet::new());
        let ids: Vec<&str> = schedule.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_input_yields_empty_schedule() {
        assert!(derive(&[], &BTreeSet::new()).is_empty());
    }

    #[test]
    fn all_completed_yields_empty_schedule() {
        let list = vec![cp("a", 10), cp("b", 20)];
        let completed: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert!(derive(&list, &completed).is_empty());
    }

    #[test]
    fn rederives_after_list_replacement() {
        let completed = BTreeSet::new();
        let empty = derive(&[], &completed);
        assert!(empty.is_empty());

        // The dynamic path swaps in a populated list later; deriving again
        // from the new list needs no incremental patching.
        let list = vec![cp("a", 400), cp("b", 100)];
        let schedule = derive(&list, &completed);
        assert_eq!(schedule[0].id, "b");
        assert_eq!(schedule[1].id, "a");
    }
}
