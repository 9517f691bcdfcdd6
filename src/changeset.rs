use std::collections::HashSet;

use anyhow::Result;
use tracing::info;

use crate::cloudwatch::AlarmBackend;
use crate::models::MetricAlarmParam;

/// Difference between the desired alarms and the alarms that exist under the
/// configured name prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    /// Desired alarms that do not exist yet, in desired order.
    pub to_create: Vec<MetricAlarmParam>,
    /// Existing alarms that are still desired.
    pub to_keep: Vec<String>,
    /// Existing alarms that are no longer desired.
    pub to_delete: Vec<String>,
}

impl Changeset {
    /// True when applying would create or delete anything.
    pub fn has_mutations(&self) -> bool {
        !self.to_create.is_empty() || !self.to_delete.is_empty()
    }
}

/// Names of all metric alarms starting with `prefix`, across every page.
///
/// Names keep the order the backend returned them in.
pub async fn get_current_alarm_names(backend: &dyn AlarmBackend, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = backend
            .describe_alarms_page(prefix, next_token.as_deref())
            .await?;
        names.extend(page.alarm_names);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Ok(names)
}

/// Three-way diff of desired alarms against current alarm names.
pub fn compute_changeset(prefix: &str, desired: &[MetricAlarmParam], current: &[String]) -> Changeset {
    let current_names: HashSet<&str> = current.iter().map(String::as_str).collect();
    let desired_names: HashSet<String> = desired.iter().map(|p| p.alarm_name(prefix)).collect();

    let to_create = desired
        .iter()
        .filter(|p| !current_names.contains(p.alarm_name(prefix).as_str()))
        .cloned()
        .collect();

    let mut seen = HashSet::with_capacity(current.len());
    let (to_keep, to_delete): (Vec<String>, Vec<String>) = current
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .partition(|name| desired_names.contains(name));

    Changeset {
        to_create,
        to_keep,
        to_delete,
    }
}

/// Read the current alarms under `prefix` and diff them against `desired`.
pub async fn get_alarms_changeset(
    backend: &dyn AlarmBackend,
    prefix: &str,
    desired: &[MetricAlarmParam],
) -> Result<Changeset> {
    let current = get_current_alarm_names(backend, prefix).await?;
    let changeset = compute_changeset(prefix, desired, &current);

    info!(
        prefix = %prefix,
        current = current.len(),
        desired = desired.len(),
        create = changeset.to_create.len(),
        keep = changeset.to_keep.len(),
        delete = changeset.to_delete.len(),
        "Computed alarm changeset"
    );

    Ok(changeset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudwatch::tests::FakeCloudWatch;
    use crate::cloudwatch::AlarmPage;
    use crate::models::{AlarmParams, AlarmProps, MetricAlarm, TargetResource};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Serves fixed pages in order, whatever token is passed back.
    struct ScriptedPages {
        pages: Vec<AlarmPage>,
        served: Mutex<usize>,
    }

    #[async_trait]
    impl AlarmBackend for ScriptedPages {
        async fn describe_alarms_page(&self, _prefix: &str, _next_token: Option<&str>) -> Result<AlarmPage> {
            let mut served = self.served.lock().unwrap();
            let page = self.pages[*served].clone();
            *served += 1;
            Ok(page)
        }

        async fn put_metric_alarm(&self, _alarm: &MetricAlarm) -> Result<()> {
            unreachable!("describe only")
        }

        async fn delete_alarms(&self, _alarm_names: &[String]) -> Result<()> {
            unreachable!("describe only")
        }
    }

    fn desired(resources: &[&str], metric: &str) -> Vec<MetricAlarmParam> {
        resources
            .iter()
            .map(|r| MetricAlarmParam {
                target_resource: TargetResource {
                    resource_name: r.to_string(),
                },
                alarm_props: AlarmProps {
                    metric_name: metric.to_string(),
                    namespace: "AWS/Lambda".to_string(),
                    dimensions: vec![],
                    params: AlarmParams::default(),
                },
            })
            .collect()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn set(items: &[String]) -> BTreeSet<String> {
        items.iter().cloned().collect()
    }

    #[test]
    fn test_keep_and_delete() {
        let changeset = compute_changeset("p-", &desired(&["A"], "m1"), &names(&["p-A-m1", "p-B-m1"]));

        assert!(changeset.to_create.is_empty());
        assert_eq!(changeset.to_keep, ["p-A-m1"]);
        assert_eq!(changeset.to_delete, ["p-B-m1"]);
    }

    #[test]
    fn test_partition_of_union() {
        let wanted = desired(&["10", "11", "20", "21", "30", "31"], "dummy");
        let current = names(&["p-11-dummy", "p-12-dummy", "p-21-dummy", "p-22-dummy", "p-31-dummy", "p-32-dummy"]);

        let changeset = compute_changeset("p-", &wanted, &current);

        let created: Vec<String> = changeset.to_create.iter().map(|p| p.alarm_name("p-")).collect();
        assert_eq!(created, ["p-10-dummy", "p-20-dummy", "p-30-dummy"]);
        assert_eq!(set(&changeset.to_keep), set(&names(&["p-11-dummy", "p-21-dummy", "p-31-dummy"])));
        assert_eq!(set(&changeset.to_delete), set(&names(&["p-12-dummy", "p-22-dummy", "p-32-dummy"])));

        let desired_names: BTreeSet<String> = wanted.iter().map(|p| p.alarm_name("p-")).collect();
        let current_names = set(&current);
        let created_set = set(&created);
        let keep = set(&changeset.to_keep);
        let delete = set(&changeset.to_delete);

        assert_eq!(created_set, &desired_names - &current_names);
        assert_eq!(delete, &current_names - &desired_names);
        assert_eq!(keep, &current_names & &desired_names);
        assert!(created_set.is_disjoint(&keep) && keep.is_disjoint(&delete) && created_set.is_disjoint(&delete));
        let union: BTreeSet<String> = created_set.union(&keep).chain(delete.iter()).cloned().collect();
        assert_eq!(union, &desired_names | &current_names);
    }

    #[test]
    fn test_create_keeps_full_specs_in_desired_order() {
        let wanted = desired(&["z", "a", "m"], "Errors");
        let changeset = compute_changeset("p-", &wanted, &[]);

        assert_eq!(changeset.to_create, wanted);
        assert!(changeset.to_keep.is_empty());
        assert!(changeset.to_delete.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_aggregates_all_pages() {
        let existing: Vec<String> = (0..250).map(|i| format!("p-res{i:03}-m")).collect();
        let backend = FakeCloudWatch::with_alarms(existing.clone());

        let current = get_current_alarm_names(&backend, "p-").await.unwrap();

        assert_eq!(current.len(), 250);
        assert_eq!(set(&current), set(&existing));
        let calls = backend.describe_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(prefix, _)| prefix == "p-"));
    }

    #[tokio::test]
    async fn test_pagination_independent_of_page_boundaries() {
        let existing: Vec<String> = (0..101).map(|i| format!("p-r{i}-m")).collect();
        for page_size in [1, 7, 50, 100, 101, 500] {
            let mut backend = FakeCloudWatch::with_alarms(existing.clone());
            backend.page_size = page_size;

            let current = get_current_alarm_names(&backend, "p-").await.unwrap();
            assert_eq!(current.len(), 101, "page size {page_size}");
        }
    }

    #[tokio::test]
    async fn test_empty_token_ends_pagination() {
        let backend = ScriptedPages {
            pages: vec![
                AlarmPage {
                    alarm_names: names(&["p-A-m1"]),
                    next_token: Some("more".to_string()),
                },
                AlarmPage {
                    alarm_names: names(&["p-B-m1"]),
                    next_token: Some(String::new()),
                },
                AlarmPage {
                    alarm_names: names(&["p-never-read"]),
                    next_token: None,
                },
            ],
            served: Mutex::new(0),
        };

        let current = get_current_alarm_names(&backend, "p-").await.unwrap();

        assert_eq!(current, ["p-A-m1", "p-B-m1"]);
        assert_eq!(*backend.served.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_prefixes_are_invisible() {
        let backend = FakeCloudWatch::with_alarms(["p-A-m1", "p-B-m1", "other-B-m1", "manual-alarm"]);

        let changeset = get_alarms_changeset(&backend, "p-", &desired(&["A", "C"], "m1"))
            .await
            .unwrap();

        let created: Vec<String> = changeset.to_create.iter().map(|p| p.alarm_name("p-")).collect();
        assert_eq!(created, ["p-C-m1"]);
        assert_eq!(changeset.to_keep, ["p-A-m1"]);
        assert_eq!(changeset.to_delete, ["p-B-m1"]);
    }

    #[test]
    fn test_has_mutations() {
        assert!(!compute_changeset("p-", &[], &[]).has_mutations());

        let keep_only = compute_changeset("p-", &desired(&["A"], "m"), &names(&["p-A-m"]));
        assert_eq!(keep_only.to_keep, ["p-A-m"]);
        assert!(!keep_only.has_mutations());

        let delete_only = compute_changeset("p-", &[], &names(&["p-A-m"]));
        assert!(delete_only.has_mutations());
    }
}
