//! Client-side copy of the user list and the form that edits it.
//!
//! Local state only changes after the API has answered: a successful create
//! appends the server's record, a successful update replaces it in place and
//! a successful delete filters it out. Failures are logged and leave the list
//! exactly as it was.

mod activity;
mod form;

use std::cell::Cell;

use tracing::{debug, warn};

use crate::client::UsersApi;
use crate::error::{Error, Result};
use crate::types::{User, UserId};

pub use activity::Activity;
pub use form::{validate, FormMode, FormState};

use activity::Busy;

pub struct UserManager<A> {
    api: A,
    users: Vec<User>,
    form: FormState,
    editing: Option<UserId>,
    activity: Cell<Activity>,
}

impl<A: UsersApi> UserManager<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            users: Vec::new(),
            form: FormState::default(),
            editing: None,
            activity: Cell::new(Activity::Idle),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
    }

    pub fn mode(&self) -> FormMode {
        match self.editing {
            Some(id) => FormMode::Edit(id),
            None => FormMode::Create,
        }
    }

    #[cfg(test)]
    fn activity(&self) -> Activity {
        self.activity.get()
    }

    /// Replace the local list with the server's.
    pub async fn list(&mut self) -> Result<()> {
        let result = {
            let _busy = Busy::enter(&self.activity, Activity::Listing);
            self.api.list_users().await
        };

        let users = result.inspect_err(|e| warn!(error = %e, "Error fetching users"))?;
        debug!(count = users.len(), "fetched users");
        self.users = users;

        if let Some(id) = self.editing {
            if !self.contains(id) {
                self.leave_edit_mode();
            }
        }

        Ok(())
    }

    /// Fetch a single user without touching the list.
    pub async fn get(&self, id: UserId) -> Result<User> {
        let _busy = Busy::enter(&self.activity, Activity::Fetching);
        self.api
            .get_user(id)
            .await
            .inspect_err(|e| warn!(error = %e, id, "Error fetching user"))
    }

    pub async fn create(&mut self, name: &str, email: &str) -> Result<User> {
        let draft = validate(name, email)?;

        let result = {
            let _busy = Busy::enter(&self.activity, Activity::Creating);
            self.api.create_user(&draft).await
        };

        let user = result.inspect_err(|e| warn!(error = %e, "Error saving user"))?;
        debug!(id = user.id, "created user");

        // The server's id is authoritative; never hold it twice.
        match self.users.iter().position(|u| u.id == user.id) {
            Some(index) => self.users[index] = user.clone(),
            None => self.users.push(user.clone()),
        }

        Ok(user)
    }

    pub async fn update(&mut self, id: UserId, name: &str, email: &str) -> Result<User> {
        let draft = validate(name, email)?;

        let result = {
            let _busy = Busy::enter(&self.activity, Activity::Updating);
            self.api.update_user(id, &draft).await
        };

        let user = result.inspect_err(|e| warn!(error = %e, id, "Error saving user"))?;
        debug!(id, "updated user");

        for existing in self.users.iter_mut().filter(|u| u.id == id) {
            *existing = user.clone();
        }

        if self.editing == Some(id) {
            self.leave_edit_mode();
        }

        Ok(user)
    }

    pub async fn delete(&mut self, id: UserId) -> Result<()> {
        let result = {
            let _busy = Busy::enter(&self.activity, Activity::Deleting);
            self.api.delete_user(id).await
        };

        result.inspect_err(|e| warn!(error = %e, id, "Error deleting user"))?;
        debug!(id, "deleted user");

        self.users.retain(|u| u.id != id);

        if self.editing == Some(id) {
            self.leave_edit_mode();
        }

        Ok(())
    }

    /// Switch the form to editing `id`, loading its current values.
    pub fn begin_edit(&mut self, id: UserId) -> Result<()> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == id)
            .ok_or(Error::UserNotFound(id))?;

        self.form = FormState::from_user(user);
        self.editing = Some(id);
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.leave_edit_mode();
    }

    /// Create or update from the form, depending on the mode. The form is
    /// cleared only when the request succeeds.
    pub async fn submit(&mut self) -> Result<User> {
        let draft = self.form.to_draft()?;

        match self.mode() {
            FormMode::Create => {
                let user = self.create(&draft.name, &draft.email).await?;
                self.form.clear();
                Ok(user)
            }
            FormMode::Edit(id) => self.update(id, &draft.name, &draft.email).await,
        }
    }

    fn contains(&self, id: UserId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn leave_edit_mode(&mut self) {
        self.editing = None;
        self.form.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::UserDraft;

    #[derive(Default)]
    struct FakeApi {
        users: Mutex<Vec<User>>,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_users(users: Vec<User>) -> Self {
            Self {
                users: Mutex::new(users),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl UsersApi for FakeApi {
        async fn list_users(&self) -> Result<Vec<User>> {
            self.check()?;
            Ok(self.users.lock().unwrap().clone())
        }

        async fn get_user(&self, id: UserId) -> Result<User> {
            self.check()?;
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or(Error::UserNotFound(id))
        }

        async fn create_user(&self, draft: &UserDraft) -> Result<User> {
            self.check()?;
            let mut users = self.users.lock().unwrap();
            let user = User {
                id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
                name: draft.name.clone(),
                email: draft.email.clone(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User> {
            self.check()?;
            Ok(User {
                id,
                name: draft.name.clone(),
                email: draft.email.clone(),
            })
        }

        async fn delete_user(&self, id: UserId) -> Result<()> {
            self.check()?;
            self.users.lock().unwrap().retain(|u| u.id != id);
            Ok(())
        }
    }

    fn user(id: UserId, name: &str, email: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    async fn mounted(users: Vec<User>) -> UserManager<FakeApi> {
        let mut manager = UserManager::new(FakeApi::with_users(users));
        manager.list().await.unwrap();
        manager
    }

    #[tokio::test]
    async fn update_scenario_replaces_record_and_leaves_edit_mode() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;

        manager.begin_edit(1).unwrap();
        assert_eq!(manager.mode(), FormMode::Edit(1));
        assert_eq!(manager.form().name, "A");

        manager.set_name("B");
        manager.set_email("b@x.com");
        manager.submit().await.unwrap();

        assert_eq!(manager.users(), &[user(1, "B", "b@x.com")]);
        assert_eq!(manager.mode(), FormMode::Create);
        assert_eq!(manager.form(), &FormState::default());
    }

    #[tokio::test]
    async fn update_leaves_other_records_alone() {
        let mut manager = mounted(vec![
            user(1, "A", "a@x.com"),
            user(2, "C", "c@x.com"),
            user(3, "D", "d@x.com"),
        ])
        .await;

        manager.update(2, "E", "e@x.com").await.unwrap();

        assert_eq!(
            manager.users(),
            &[
                user(1, "A", "a@x.com"),
                user(2, "E", "e@x.com"),
                user(3, "D", "d@x.com"),
            ]
        );
    }

    #[tokio::test]
    async fn create_appends_server_record_once() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;

        let created = manager.create("B", "b@x.com").await.unwrap();

        assert_eq!(created.id, 2);
        assert_eq!(
            manager.users().iter().filter(|u| u.id == created.id).count(),
            1
        );
        assert_eq!(manager.users().len(), 2);
    }

    #[tokio::test]
    async fn create_does_not_duplicate_an_id_already_listed() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;
        // Server-side row exists but the local list is stale.
        manager.api.users.lock().unwrap().push(user(2, "X", "x@x.com"));
        manager.users.push(user(3, "Y", "y@x.com"));

        let created = manager.create("B", "b@x.com").await.unwrap();

        assert_eq!(created.id, 3);
        assert_eq!(manager.users().iter().filter(|u| u.id == 3).count(), 1);
        assert_eq!(manager.users().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let mut manager = mounted(vec![
            user(1, "A", "a@x.com"),
            user(2, "B", "b@x.com"),
        ])
        .await;

        manager.delete(1).await.unwrap();

        assert_eq!(manager.users(), &[user(2, "B", "b@x.com")]);
    }

    #[tokio::test]
    async fn deleting_the_edited_user_returns_to_create_mode() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;
        manager.begin_edit(1).unwrap();

        manager.delete(1).await.unwrap();

        assert_eq!(manager.mode(), FormMode::Create);
        assert!(manager.form().name.is_empty());
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_without_a_request() {
        let mut manager = UserManager::new(FakeApi::default());

        assert!(matches!(
            manager.create("", "a@x.com").await,
            Err(Error::EmptyField("name"))
        ));
        assert!(matches!(
            manager.update(1, "A", "").await,
            Err(Error::EmptyField("email"))
        ));

        manager.set_name("A");
        assert!(manager.submit().await.is_err());

        assert_eq!(manager.api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_leave_state_unchanged_and_idle() {
        let original = vec![user(1, "A", "a@x.com"), user(2, "B", "b@x.com")];
        let mut manager = mounted(original.clone()).await;
        manager.api.fail.store(true, Ordering::SeqCst);

        assert!(manager.list().await.is_err());
        assert!(manager.create("C", "c@x.com").await.is_err());
        assert!(manager.update(1, "Z", "z@x.com").await.is_err());
        assert!(manager.delete(2).await.is_err());
        assert!(manager.get(1).await.is_err());

        assert_eq!(manager.users(), original.as_slice());
        assert_eq!(manager.activity(), Activity::Idle);
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_form() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;
        manager.begin_edit(1).unwrap();
        manager.set_name("B");
        manager.api.fail.store(true, Ordering::SeqCst);

        assert!(manager.submit().await.is_err());

        assert_eq!(manager.mode(), FormMode::Edit(1));
        assert_eq!(manager.form().name, "B");
        assert_eq!(manager.users(), &[user(1, "A", "a@x.com")]);
    }

    #[tokio::test]
    async fn create_submit_clears_the_form() {
        let mut manager = mounted(Vec::new()).await;
        manager.set_name("Ada");
        manager.set_email("ada@example.com");

        let created = manager.submit().await.unwrap();

        assert_eq!(manager.users(), &[created]);
        assert_eq!(manager.form(), &FormState::default());
    }

    #[tokio::test]
    async fn cancel_returns_to_create_mode() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;
        manager.begin_edit(1).unwrap();

        manager.cancel_edit();

        assert_eq!(manager.mode(), FormMode::Create);
        assert_eq!(manager.form(), &FormState::default());
    }

    #[tokio::test]
    async fn begin_edit_requires_a_listed_user() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;

        assert!(matches!(manager.begin_edit(9), Err(Error::UserNotFound(9))));
        assert_eq!(manager.mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn refresh_drops_edit_target_that_vanished() {
        let mut manager = mounted(vec![user(1, "A", "a@x.com")]).await;
        manager.begin_edit(1).unwrap();
        manager.api.users.lock().unwrap().clear();

        manager.list().await.unwrap();

        assert!(manager.users().is_empty());
        assert_eq!(manager.mode(), FormMode::Create);
    }
}
