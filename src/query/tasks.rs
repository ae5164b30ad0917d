use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

use super::{Searchable, ViewQuery, derive_view, has_all_tags};
use crate::models::{ParseEnumError, Task, TaskCategory};

impl Searchable for Task {
    fn any_search_field(&self, pred: &mut dyn FnMut(&str) -> bool) -> bool {
        pred(self.title.as_str())
            || self.description.as_deref().is_some_and(|d| pred(d))
            || pred(self.category.as_str())
            || self.tags.iter().any(|tag| pred(tag.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Not completed
    Active,
    Completed,
    /// Not completed and past due
    Overdue,
}

impl StatusFilter {
    pub fn admits(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
            StatusFilter::Overdue => task.is_overdue(now),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "overdue" => Ok(StatusFilter::Overdue),
            _ => Err(ParseEnumError {
                kind: "status filter",
                value: s.to_string(),
                expected: "all active completed overdue",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    /// Earliest due first
    #[default]
    DueDate,
    /// Highest priority first, then earliest due
    Priority,
    /// Most recently created first
    Created,
    /// Most recently updated first
    Updated,
}

impl TaskSort {
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            TaskSort::DueDate => a.due_date.cmp(&b.due_date),
            TaskSort::Priority => b
                .priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| a.due_date.cmp(&b.due_date)),
            TaskSort::Created => b.created_at.cmp(&a.created_at),
            TaskSort::Updated => b.updated_at.cmp(&a.updated_at),
        }
    }
}

impl FromStr for TaskSort {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "due" | "duedate" | "due-date" => Ok(TaskSort::DueDate),
            "priority" => Ok(TaskSort::Priority),
            "created" => Ok(TaskSort::Created),
            "updated" => Ok(TaskSort::Updated),
            _ => Err(ParseEnumError {
                kind: "task sort",
                value: s.to_string(),
                expected: "due priority created updated",
            }),
        }
    }
}

/// Task query parameters. `now` pins the instant that overdue is measured
/// against so a derived view is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub text: String,
    pub status: StatusFilter,
    pub category: Option<TaskCategory>,
    pub tags: Vec<String>,
    pub sort: TaskSort,
    pub now: DateTime<Utc>,
}

impl TaskQuery {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            text: String::new(),
            status: StatusFilter::All,
            category: None,
            tags: Vec::new(),
            sort: TaskSort::DueDate,
            now,
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        derive_view(tasks, self)
    }
}

impl ViewQuery<Task> for TaskQuery {
    fn text(&self) -> &str {
        &self.text
    }

    fn admits(&self, task: &Task) -> bool {
        self.status.admits(task, self.now)
            && self.category.is_none_or(|c| task.category == c)
            && has_all_tags(&task.tags, &self.tags)
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        self.sort.compare(a, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub overdue: usize,
    pub due_today: usize,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            active: tasks.len() - completed,
            overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
            due_today: tasks.iter().filter(|t| t.is_due_today(now)).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn task(id: u64, title: &str, priority: Priority, due_in_days: i64) -> Task {
        let created = now() - Duration::days(30) + Duration::hours(id as i64);
        Task {
            id,
            title: title.to_string(),
            description: None,
            completed: false,
            priority,
            due_date: now() + Duration::days(due_in_days),
            category: TaskCategory::Personal,
            tags: Vec::new(),
            created_at: created,
            updated_at: created,
        }
    }

    fn ids(view: &[&Task]) -> Vec<u64> {
        view.iter().map(|t| t.id).collect()
    }

    fn sample() -> Vec<Task> {
        let mut proposal = task(1, "Complete project proposal", Priority::High, 3);
        proposal.description = Some("Finish the Q1 project timeline".to_string());
        proposal.category = TaskCategory::Work;
        proposal.tags = vec!["work".to_string(), "urgent".to_string()];
        let mut groceries = task(2, "Buy groceries", Priority::Medium, -1);
        groceries.tags = vec!["shopping".to_string()];
        let mut dentist = task(3, "Call dentist", Priority::Low, -2);
        dentist.completed = true;
        let review = task(4, "Review budget", Priority::High, 1);
        let gym = task(5, "Gym session", Priority::Medium, 0);
        vec![proposal, groceries, dentist, review, gym]
    }

    #[test]
    fn default_sort_is_due_date_ascending() {
        let tasks = sample();
        let view = TaskQuery::new(now()).apply(&tasks);
        assert_eq!(ids(&view), vec![3, 2, 5, 4, 1]);
    }

    #[test]
    fn priority_sort_breaks_ties_by_due_date() {
        let tasks = sample();
        let query = TaskQuery {
            sort: TaskSort::Priority,
            ..TaskQuery::new(now())
        };
        let view = query.apply(&tasks);
        assert_eq!(ids(&view), vec![4, 1, 2, 5, 3]);
        for pair in view.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.priority.rank() >= b.priority.rank());
            if a.priority == b.priority {
                assert!(a.due_date <= b.due_date);
            }
        }
    }

    #[test]
    fn created_and_updated_sorts_are_newest_first() {
        let mut tasks = sample();
        tasks[2].updated_at = now();
        let created = TaskQuery {
            sort: TaskSort::Created,
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&created.apply(&tasks)), vec![5, 4, 3, 2, 1]);
        let updated = TaskQuery {
            sort: "updated".parse().expect("sort key"),
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&updated.apply(&tasks))[0], 3);
    }

    #[test]
    fn yesterdays_open_task_is_overdue_not_completed() {
        let tasks = vec![task(1, "Pay rent", Priority::High, -1)];
        let overdue = TaskQuery {
            status: StatusFilter::Overdue,
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&overdue.apply(&tasks)), vec![1]);
        let completed = TaskQuery {
            status: StatusFilter::Completed,
            ..TaskQuery::new(now())
        };
        assert!(completed.apply(&tasks).is_empty());
    }

    #[test]
    fn status_filters() {
        let tasks = sample();
        let with = |status| {
            ids(&TaskQuery {
                status,
                ..TaskQuery::new(now())
            }
            .apply(&tasks))
        };
        assert_eq!(with(StatusFilter::Active), vec![2, 5, 4, 1]);
        assert_eq!(with(StatusFilter::Completed), vec![3]);
        // the completed dentist task is past due but not overdue
        assert_eq!(with(StatusFilter::Overdue), vec![2]);
        assert_eq!(with(StatusFilter::All).len(), 5);
    }

    #[test]
    fn search_finds_words_in_descriptions() {
        let tasks = sample();
        let query = TaskQuery {
            text: "project".to_string(),
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&query.apply(&tasks)), vec![1]);

        let query = TaskQuery {
            text: "project timeline".to_string(),
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&query.apply(&tasks)), vec![1]);
    }

    #[test]
    fn category_and_tag_filters() {
        let tasks = sample();
        let query = TaskQuery {
            category: Some(TaskCategory::Work),
            ..TaskQuery::new(now())
        };
        assert_eq!(ids(&query.apply(&tasks)), vec![1]);
        let query = TaskQuery {
            tags: vec!["urgent".to_string(), "shopping".to_string()],
            ..TaskQuery::new(now())
        };
        assert!(query.apply(&tasks).is_empty());
    }

    #[test]
    fn stats_count_each_bucket() {
        let tasks = sample();
        let stats = TaskStats::compute(&tasks, now());
        assert_eq!(
            stats,
            TaskStats {
                total: 5,
                completed: 1,
                active: 4,
                overdue: 1,
                due_today: 1,
            }
        );
    }

    #[test]
    fn unknown_filter_names_are_rejected() {
        assert_eq!("done".parse::<StatusFilter>(), Ok(StatusFilter::Completed));
        assert!("someday".parse::<StatusFilter>().is_err());
        assert_eq!("due".parse::<TaskSort>(), Ok(TaskSort::DueDate));
    }
}
