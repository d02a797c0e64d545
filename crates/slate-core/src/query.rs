use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::deadline::{Urgency, classify};
use crate::task::{Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Deadline,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "deadline" | "due" => Some(SortField::Deadline),
            "created" | "createdat" => Some(SortField::CreatedAt),
            "updated" | "updatedat" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketFilter {
    Overdue,
    Today,
    Soon,
    Future,
    All,
}

impl BucketFilter {
    pub fn name(self) -> &'static str {
        match self {
            BucketFilter::Overdue => "overdue",
            BucketFilter::Today => "today",
            BucketFilter::Soon => "soon",
            BucketFilter::Future => "future",
            BucketFilter::All => "all",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "overdue" => Some(BucketFilter::Overdue),
            "today" => Some(BucketFilter::Today),
            "soon" => Some(BucketFilter::Soon),
            "future" | "normal" => Some(BucketFilter::Future),
            "all" => Some(BucketFilter::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    pub search: Option<String>,
    pub status: Option<Status>,
    pub bucket: Option<BucketFilter>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            bucket: None,
            sort_field: SortField::Deadline,
            sort_order: SortOrder::Ascending,
        }
    }
}

impl Query {
    #[tracing::instrument(skip(terms))]
    pub fn parse(terms: &[String]) -> anyhow::Result<Self> {
        let mut query = Query::default();
        let mut search_words: Vec<&str> = vec![];

        for term in terms {
            if let Some(value) = term.strip_prefix("status:") {
                let status = Status::parse_name(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown status: {value}"))?;
                query.status = Some(status);
                continue;
            }
            if let Some(value) = term.strip_prefix("due:") {
                let bucket = BucketFilter::parse_name(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown date bucket: {value}"))?;
                query.bucket = Some(bucket);
                continue;
            }
            if let Some(value) = term.strip_prefix("sort:") {
                let field = SortField::parse_name(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown sort field: {value}"))?;
                query.sort_field = field;
                continue;
            }
            if let Some(value) = term.strip_prefix("order:") {
                let order = SortOrder::parse_name(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown sort order: {value}"))?;
                query.sort_order = order;
                continue;
            }
            search_words.push(term);
        }

        if !search_words.is_empty() {
            query.search = Some(search_words.join(" "));
        }

        Ok(query)
    }
}

// Case-insensitive substring match over title, description and id.
pub fn matches_search(task: &Task, term: &str) -> bool {
    let needle = term.to_ascii_lowercase();
    if task.title.to_ascii_lowercase().contains(&needle) {
        return true;
    }
    if let Some(description) = &task.description
        && description.to_ascii_lowercase().contains(&needle)
    {
        return true;
    }
    task.id.to_ascii_lowercase().contains(&needle)
}

fn in_bucket(task: &Task, bucket: BucketFilter, now: DateTime<Utc>) -> bool {
    match bucket {
        BucketFilter::All => true,
        BucketFilter::Overdue => classify(task, now) == Urgency::Overdue,
        BucketFilter::Today => classify(task, now) == Urgency::Today,
        BucketFilter::Soon => classify(task, now) == Urgency::Soon,
        BucketFilter::Future => classify(task, now) == Urgency::Normal,
    }
}

fn sort_key(task: &Task, field: SortField) -> Option<DateTime<Utc>> {
    match field {
        SortField::Deadline => task.deadline,
        SortField::CreatedAt => Some(task.created_at),
        SortField::UpdatedAt => Some(task.updated_at),
    }
}

// A task without the sort field's timestamp sorts as if it were infinitely
// far in the future: last ascending, first descending.
fn compare_keys(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[tracing::instrument(skip(tasks, query, now))]
pub fn filter_and_sort(tasks: &[Task], query: &Query, now: DateTime<Utc>) -> Vec<Task> {
    let mut rows: Vec<Task> = tasks
        .iter()
        .filter(|task| {
            query
                .search
                .as_deref()
                .map(|term| matches_search(task, term))
                .unwrap_or(true)
        })
        .filter(|task| {
            query
                .status
                .map(|status| task.status == status)
                .unwrap_or(true)
        })
        .filter(|task| {
            query
                .bucket
                .map(|bucket| in_bucket(task, bucket, now))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        let ordering = compare_keys(sort_key(a, query.sort_field), sort_key(b, query.sort_field));
        match query.sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    trace!(
        input = tasks.len(),
        output = rows.len(),
        "filtered and sorted task view"
    );
    rows
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{BucketFilter, Query, SortField, SortOrder, filter_and_sort};
    use crate::task::{Status, Task};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap()
    }

    fn task(title: &str, now: chrono::DateTime<Utc>) -> Task {
        Task::new(title.to_string(), now)
    }

    #[test]
    fn undated_tasks_sort_after_dated_ascending_and_before_descending() {
        let now = fixed_now();
        let undated = task("A undated", now);
        let mut dated = task("B tomorrow", now);
        dated.deadline = Some(now + Duration::days(1));

        let asc = filter_and_sort(
            &[undated.clone(), dated.clone()],
            &Query::default(),
            now,
        );
        assert_eq!(asc[0].id, dated.id);
        assert_eq!(asc[1].id, undated.id);

        let desc = filter_and_sort(
            &[undated.clone(), dated.clone()],
            &Query {
                sort_order: SortOrder::Descending,
                ..Query::default()
            },
            now,
        );
        assert_eq!(desc[0].id, undated.id);
        assert_eq!(desc[1].id, dated.id);
    }

    #[test]
    fn equal_keys_keep_their_relative_order_in_both_directions() {
        let now = fixed_now();
        let deadline = now + Duration::days(2);
        let mut first = task("first", now);
        first.deadline = Some(deadline);
        let mut second = task("second", now);
        second.deadline = Some(deadline);
        let tasks = [first.clone(), second.clone()];

        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let rows = filter_and_sort(
                &tasks,
                &Query {
                    sort_order: order,
                    ..Query::default()
                },
                now,
            );
            assert_eq!(rows[0].id, first.id);
            assert_eq!(rows[1].id, second.id);
        }
    }

    #[test]
    fn search_is_case_insensitive_over_title_description_and_id() {
        let now = fixed_now();
        let mut by_title = task("Fix login BUG", now);
        by_title.description = None;
        let mut by_description = task("Refactor", now);
        by_description.description = Some("tracks a bug in the parser".to_string());
        let miss = task("Write docs", now);

        let query = Query {
            search: Some("Bug".to_string()),
            ..Query::default()
        };
        let rows = filter_and_sort(
            &[by_title.clone(), by_description.clone(), miss.clone()],
            &query,
            now,
        );
        assert_eq!(rows.len(), 2);

        let id_fragment = miss.id[..8].to_ascii_uppercase();
        let by_id = Query {
            search: Some(id_fragment),
            ..Query::default()
        };
        let rows = filter_and_sort(&[by_title, by_description, miss.clone()], &by_id, now);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, miss.id);
    }

    #[test]
    fn filters_compose_and_keep_pre_sort_order() {
        let now = fixed_now();
        let mut fixture = vec![];
        for (idx, (title, status)) in [
            ("bug in parser", Status::Todo),
            ("bug in lexer", Status::Done),
            ("docs pass", Status::Todo),
            ("bug triage", Status::Todo),
            ("bug backlog grooming", Status::Todo),
            ("release notes", Status::InProgress),
            ("bug in renderer", Status::Cancelled),
            ("spike: new bug tracker", Status::Todo),
            ("standup notes", Status::Todo),
            ("bugfix verification", Status::InProgress),
        ]
        .into_iter()
        .enumerate()
        {
            let mut item = task(title, now + Duration::seconds(idx as i64));
            item.status = status;
            fixture.push(item);
        }

        let query = Query {
            search: Some("bug".to_string()),
            status: Some(Status::Todo),
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Ascending,
            ..Query::default()
        };
        let rows = filter_and_sort(&fixture, &query, now);

        let titles: Vec<&str> = rows.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "bug in parser",
                "bug triage",
                "bug backlog grooming",
                "spike: new bug tracker",
            ]
        );
    }

    #[test]
    fn overdue_bucket_excludes_closed_tasks_and_undated_tasks() {
        let now = fixed_now();
        let yesterday = now - Duration::days(1);

        let mut open_overdue = task("Fix bug", now);
        open_overdue.deadline = Some(yesterday);

        let mut done_overdue = task("Write docs", now);
        done_overdue.deadline = Some(yesterday);
        done_overdue.status = Status::Done;

        let undated = task("Someday", now);

        let query = Query {
            bucket: Some(BucketFilter::Overdue),
            ..Query::default()
        };
        let rows = filter_and_sort(
            &[open_overdue.clone(), done_overdue, undated],
            &query,
            now,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, open_overdue.id);
    }

    #[test]
    fn the_all_bucket_is_a_no_op() {
        let now = fixed_now();
        let undated = task("Undated", now);
        let mut dated = task("Dated", now);
        dated.deadline = Some(now + Duration::days(10));

        let query = Query {
            bucket: Some(BucketFilter::All),
            ..Query::default()
        };
        assert_eq!(filter_and_sort(&[undated, dated], &query, now).len(), 2);
    }

    #[test]
    fn parse_recognizes_prefixed_terms_and_collects_search_words() {
        let terms: Vec<String> = [
            "parser",
            "status:todo",
            "due:soon",
            "sort:updated",
            "order:desc",
            "bug",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let query = Query::parse(&terms).expect("parse query");
        assert_eq!(query.search.as_deref(), Some("parser bug"));
        assert_eq!(query.status, Some(Status::Todo));
        assert_eq!(query.bucket, Some(BucketFilter::Soon));
        assert_eq!(query.sort_field, SortField::UpdatedAt);
        assert_eq!(query.sort_order, SortOrder::Descending);

        assert!(Query::parse(&["status:nope".to_string()]).is_err());
    }
}
