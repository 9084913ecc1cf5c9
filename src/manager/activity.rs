use std::cell::Cell;

/// What the manager is waiting on, if anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Listing,
    /// Loading a single user; the list is left alone.
    Fetching,
    Creating,
    Updating,
    Deleting,
}

impl Activity {
    /// Status line shown while a request is in flight.
    pub fn label(self) -> &'static str {
        match self {
            Activity::Idle => "Idle",
            Activity::Listing | Activity::Fetching => "Loading...",
            Activity::Creating | Activity::Updating => "Saving...",
            Activity::Deleting => "Deleting...",
        }
    }
}

/// Marks an activity for as long as it lives; resets to idle on drop,
/// including when the owning future is dropped mid-request.
pub(super) struct Busy<'a> {
    slot: &'a Cell<Activity>,
}

impl<'a> Busy<'a> {
    pub(super) fn enter(slot: &'a Cell<Activity>, activity: Activity) -> Self {
        slot.set(activity);
        Self { slot }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.slot.set(Activity::Idle);
    }
}
