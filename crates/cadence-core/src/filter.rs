use crate::task::{Category, Priority, Status, Task};

/// Optional category/status/priority equality filters plus the
/// "hide completed" toggle shared by every view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub hide_completed: bool,
}

impl FilterSet {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(category) = self.category
            && task.category != category
        {
            return false;
        }
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if self.hide_completed && task.is_completed() {
            return false;
        }
        true
    }

    pub fn apply<'a, I>(&self, tasks: I) -> Vec<&'a Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}
