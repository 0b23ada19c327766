//! Address book and the address modal.
//!
//! [`AddressBook`] holds the store operations on
//! `user-data/{uid}/addresses`. [`AddressManager`] is the modal's state
//! machine: it validates each [`AddressEvent`] against the current view,
//! runs the resulting store operation, and only then moves to the next
//! state, so a failed event leaves the modal as it was.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{Address, AddressField, AddressForm, AddressId, AddressModal};

use super::BatchReport;
use super::profile::ProfileLoader;
use crate::db::{DocumentStore, JsonMap, RepositoryError, paths, to_document};
use crate::models::UserContext;

const DEFAULT_FIELD: &str = "default";

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("cannot handle {event} in {view} (open: {open})")]
    InvalidTransition {
        event: &'static str,
        view: AddressModal,
        open: bool,
    },

    #[error("address not found: {0}")]
    NotFound(AddressId),

    #[error("failed to unset {0} previous default address(es)")]
    ResetDefaults(usize),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Store operations on a user's addresses.
pub struct AddressBook<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> AddressBook<'a> {
    /// Create an address book over `store`.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All of the user's addresses, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing fails.
    pub async fn list(&self, ctx: &UserContext) -> Result<Vec<Address>, RepositoryError> {
        ProfileLoader::new(self.store).addresses(ctx).await
    }

    /// Order addresses for display: the default first, the rest as stored.
    #[must_use]
    pub fn sorted_for_display(addresses: &[Address]) -> Vec<&Address> {
        let (defaults, others): (Vec<&Address>, Vec<&Address>) =
            addresses.iter().partition(|address| address.is_default);
        defaults.into_iter().chain(others).collect()
    }

    /// Store a new address built from `form` under a generated id.
    ///
    /// New addresses are never the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    #[instrument(skip(self, form), fields(uid = %ctx.uid()))]
    pub async fn add(
        &self,
        ctx: &UserContext,
        mut form: AddressForm,
    ) -> Result<AddressId, RepositoryError> {
        form.is_default = false;
        let id = self
            .store
            .add(&paths::addresses(ctx.uid())?, to_document(&form)?)
            .await?;
        tracing::info!(address_id = %id, "Address added");
        Ok(id.into())
    }

    /// Unset the default flag on every address that has it.
    ///
    /// The updates run concurrently and are all awaited.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only if the query fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn reset_defaults(
        &self,
        ctx: &UserContext,
    ) -> Result<BatchReport<AddressId>, RepositoryError> {
        let collection = paths::addresses(ctx.uid())?;
        let defaults = self
            .store
            .find_eq(&collection, DEFAULT_FIELD, &Value::Bool(true))
            .await?;

        let updates = defaults.into_iter().map(|doc| {
            let collection = &collection;
            async move {
                let id = AddressId::from(doc.id);
                let result = match collection.doc(id.as_str()) {
                    Ok(path) => self.store.update(&path, default_flag(false)).await,
                    Err(e) => Err(e),
                };
                (id, result)
            }
        });

        Ok(BatchReport::collect(join_all(updates).await))
    }

    /// Make `id` the user's only default address.
    ///
    /// Previous defaults are unset first; if any of those writes fails the
    /// new default is not set.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` for an unknown id,
    /// `AddressError::ResetDefaults` if previous defaults could not all be
    /// unset, or `AddressError::Store` on a store failure.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn set_default(&self, ctx: &UserContext, id: &AddressId) -> Result<(), AddressError> {
        let path = paths::address(ctx.uid(), id)?;
        if self.store.get(&path).await?.is_none() {
            return Err(AddressError::NotFound(id.clone()));
        }

        let reset = self.reset_defaults(ctx).await?;
        if !reset.is_complete() {
            for (address_id, error) in &reset.failed {
                tracing::warn!(%address_id, error = %error, "Failed to unset default address");
            }
            return Err(AddressError::ResetDefaults(reset.failed.len()));
        }

        if !self.store.update(&path, default_flag(true)).await? {
            // Deleted between the check and the update.
            return Err(AddressError::NotFound(id.clone()));
        }
        tracing::info!(address_id = %id, "Default address set");
        Ok(())
    }
}

fn default_flag(value: bool) -> JsonMap {
    let mut fields = JsonMap::new();
    fields.insert(DEFAULT_FIELD.to_owned(), Value::Bool(value));
    fields
}

/// User interaction with the address modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AddressEvent {
    /// Show the modal again, starting from a fresh state.
    Open,
    /// "Add an address" button.
    AddClicked,
    /// Typing into a form field.
    FormInput { field: AddressField, value: String },
    /// Leave the form without saving.
    Cancel,
    /// Save the form as a new address.
    Submit,
    /// Click on an address to make it the default.
    Select { id: AddressId },
    /// "Done" button.
    Done,
    /// Click outside the modal.
    OverlayClick,
}

impl AddressEvent {
    /// Short name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::AddClicked => "addClicked",
            Self::FormInput { .. } => "formInput",
            Self::Cancel => "cancel",
            Self::Submit => "submit",
            Self::Select { .. } => "select",
            Self::Done => "done",
            Self::OverlayClick => "overlayClick",
        }
    }
}

/// Store operation required by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    AddAddress(AddressForm),
    SetDefault(AddressId),
}

/// View state of the address modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressManager {
    view: AddressModal,
    open: bool,
    form: AddressForm,
}

impl Default for AddressManager {
    fn default() -> Self {
        Self {
            view: AddressModal::ChooseAddress,
            open: true,
            form: AddressForm::default(),
        }
    }
}

impl AddressManager {
    /// A freshly opened modal showing the address list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn view(&self) -> AddressModal {
        self.view
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Pending form input.
    #[must_use]
    pub const fn form(&self) -> &AddressForm {
        &self.form
    }

    /// Compute the state after `event` and the store operation it needs.
    ///
    /// Pure: `self` is not modified.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::InvalidTransition` if `event` is not accepted
    /// in the current view.
    pub fn transition(&self, event: AddressEvent) -> Result<(Self, Effect), AddressError> {
        use AddressModal::{AddAddress, ChooseAddress};

        let mut next = self.clone();
        let effect = match (self.open, self.view, event) {
            (_, _, AddressEvent::Open) => {
                next = Self::new();
                Effect::None
            }
            (true, ChooseAddress, AddressEvent::AddClicked) => {
                next.view = AddAddress;
                Effect::None
            }
            (true, AddAddress, AddressEvent::FormInput { field, value }) => {
                next.form.set(field, value);
                Effect::None
            }
            (true, AddAddress, AddressEvent::Cancel) => {
                next.view = ChooseAddress;
                Effect::None
            }
            (true, AddAddress, AddressEvent::Submit) => {
                next.view = ChooseAddress;
                Effect::AddAddress(std::mem::take(&mut next.form))
            }
            (true, ChooseAddress, AddressEvent::Select { id }) => {
                next.open = false;
                Effect::SetDefault(id)
            }
            (true, ChooseAddress, AddressEvent::Done) | (true, _, AddressEvent::OverlayClick) => {
                next.open = false;
                Effect::None
            }
            (open, view, event) => {
                return Err(AddressError::InvalidTransition {
                    event: event.name(),
                    view,
                    open,
                });
            }
        };
        Ok((next, effect))
    }

    /// Apply `event`, running its store operation against `book`.
    ///
    /// The state only changes once the operation has succeeded. Returns
    /// whether the address collection was modified.
    ///
    /// # Errors
    ///
    /// Returns `AddressError` if the event is invalid in the current view or
    /// its store operation fails.
    #[instrument(skip(self, book, event), fields(uid = %ctx.uid(), event = event.name()))]
    pub async fn handle(
        &mut self,
        book: &AddressBook<'_>,
        ctx: &UserContext,
        event: AddressEvent,
    ) -> Result<bool, AddressError> {
        let (next, effect) = self.transition(event)?;

        let mutated = match effect {
            Effect::None => false,
            Effect::AddAddress(form) => {
                book.add(ctx, form).await?;
                true
            }
            Effect::SetDefault(id) => {
                book.set_default(ctx, &id).await?;
                true
            }
        };

        *self = next;
        Ok(mutated)
    }
}
