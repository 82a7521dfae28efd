use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    domain::{
        ArrayField, Choice, CountConstraints, FieldDefinition, ServerError, ServerFieldError,
        SessionInput,
    },
    form::{
        ActiveItem, ItemId, ReorderReport, SessionError, SubDocument, WorkingSet,
        detect_doc_change, new_instance,
    },
};

use super::{
    host::{FormRenderer, Notifier},
    options::SessionOptions,
    validation::{CountState, ItemValidator},
};

/// Where the session stands between user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Editing,
    /// The previous item has been closed and the form is unmounting; `target` opens on
    /// [`ArraySession::complete_select`].
    Switching { target: ItemId },
    Finished,
}

/// Terminal signal handed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ModalResult(Vec<SubDocument>),
    SafeClose,
}

/// First half of a two-phase item switch. Must be passed back to
/// [`ArraySession::complete_select`] after the host has rendered one tick.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the switch only completes once the pending item is opened"]
pub struct PendingSelect {
    target: ItemId,
}

impl PendingSelect {
    pub fn target(&self) -> &ItemId {
        &self.target
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SelectStep {
    AlreadyActive,
    Blocked,
    Pending(PendingSelect),
}

/// Edit session for one repeatable field.
pub struct ArraySession<H> {
    pub(super) field: ArrayField,
    pub(super) schema: Vec<FieldDefinition>,
    constraints: CountConstraints,
    pub(super) next: WorkingSet,
    original: Vec<SubDocument>,
    active: Option<ActiveItem>,
    phase: SessionPhase,
    counts: CountState,
    trigger_validation: bool,
    server_error: Option<ServerError>,
    meta: IndexMap<String, Value>,
    item_validator: ItemValidator,
    pub(super) title_choices: Option<Vec<Choice>>,
    options: SessionOptions,
    host: H,
    outcome: Option<SessionEvent>,
}

impl<H: FormRenderer + Notifier> ArraySession<H> {
    pub fn new(input: SessionInput, options: SessionOptions, host: H) -> Self {
        let schema = input.item_schema();
        let SessionInput {
            items,
            field,
            server_error,
            meta,
            ..
        } = input;
        let constraints = field.constraints();
        let next = WorkingSet::from_items(items);
        let original = next.to_vec();
        let counts = CountState::evaluate(next.len(), &constraints);
        let item_validator = ItemValidator::new(&schema);
        debug!(items = next.len(), min = constraints.min, max = ?constraints.max, "array session opened");
        Self {
            field,
            schema,
            constraints,
            next,
            original,
            active: None,
            phase: SessionPhase::Editing,
            counts,
            trigger_validation: false,
            server_error,
            meta,
            item_validator,
            title_choices: None,
            options,
            host,
            outcome: None,
        }
    }

    /// Opens the first item, then the item targeted by the first server error (scrolling
    /// its field into view).
    pub fn mount(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if let Some(first) = self.next.first_id().cloned() {
            self.select(&first)?;
        }
        let Some((id, field)) = self.first_server_error_target() else {
            return Ok(());
        };
        if !self.next.contains(&id) {
            warn!(id = %id, "server error targets an item that is not in the list");
            return Ok(());
        }
        if !self.select(&id)? {
            return Ok(());
        }
        if self.options.scroll_to_server_error
            && let Some(field) = field
        {
            self.host.next_tick();
            self.host.scroll_field_into_view(&field);
        }
        Ok(())
    }

    fn first_server_error_target(&self) -> Option<(ItemId, Option<String>)> {
        let error = self.server_error.as_ref()?.errors().first()?;
        let (id, field) = error.target();
        Some((ItemId::from(id), field.map(str::to_string)))
    }

    /// Switches the open item: validate the current one, close it, let the form unmount
    /// for one tick, then open `id`. Returns whether `id` is open afterwards.
    pub fn select(&mut self, id: &ItemId) -> Result<bool, SessionError> {
        match self.begin_select(id)? {
            SelectStep::AlreadyActive => Ok(true),
            SelectStep::Blocked => Ok(false),
            SelectStep::Pending(pending) => {
                self.host.next_tick();
                self.complete_select(pending)
            }
        }
    }

    /// Close phase of a switch. On success the previous item has been flushed into the
    /// working set and nothing is open.
    pub fn begin_select(&mut self, id: &ItemId) -> Result<SelectStep, SessionError> {
        self.ensure_open()?;
        if self.active_id() == Some(id) {
            return Ok(SelectStep::AlreadyActive);
        }
        if !self.next.contains(id) {
            return Err(SessionError::UnknownItem(id.clone()));
        }
        if !self.validate(true, false)? {
            return Ok(SelectStep::Blocked);
        }
        self.flush_active_into_working_set();
        self.active = None;
        self.phase = SessionPhase::Switching { target: id.clone() };
        debug!(target = %id, "closed active item");
        Ok(SelectStep::Pending(PendingSelect { target: id.clone() }))
    }

    /// Open phase of a switch. Returns `false` when the target was removed while the
    /// switch was in flight.
    pub fn complete_select(&mut self, pending: PendingSelect) -> Result<bool, SessionError> {
        self.ensure_open()?;
        match &self.phase {
            SessionPhase::Switching { target } if *target == pending.target => {}
            SessionPhase::Switching { target } => {
                return Err(SessionError::UnexpectedBarrier {
                    expected: Some(target.clone()),
                    found: pending.target,
                });
            }
            _ => {
                return Err(SessionError::UnexpectedBarrier {
                    expected: None,
                    found: pending.target,
                });
            }
        }
        self.phase = SessionPhase::Editing;
        let Some(doc) = self.next.get(&pending.target).cloned() else {
            debug!(target = %pending.target, "switch target vanished before opening");
            return Ok(false);
        };
        self.active = Some(ActiveItem::open(doc, &self.schema));
        self.trigger_validation = false;
        debug!(id = %pending.target, "opened item");
        Ok(true)
    }

    /// Called by the form layer whenever a field changes.
    pub fn update_active_item(
        &mut self,
        fields: Map<String, Value>,
        has_errors: bool,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::NoActiveItem);
        };
        active.replace(fields, has_errors, &self.schema);
        if self.trigger_validation && self.options.validate_schema_fields {
            let errors = self.item_validator.check(active.form_state(), active.visibility());
            active.set_field_errors(errors);
        } else {
            active.set_field_errors(IndexMap::new());
        }
        Ok(())
    }

    /// Writes the open item's form state back over its working-set entry. No-op when
    /// nothing is open.
    pub fn flush_active_into_working_set(&mut self) {
        if let Some(active) = &self.active
            && !self.next.replace(active.form_state().clone())
        {
            warn!(id = %active.id(), "active item is no longer in the working set");
        }
    }

    pub fn current_field_value(&self, name: &str) -> Result<Option<&Value>, SessionError> {
        self.active
            .as_ref()
            .map(|active| active.value(name))
            .ok_or(SessionError::NoActiveItem)
    }

    /// Applies a new ordering; unseen ids become fresh items built from schema defaults.
    pub fn reorder_or_insert(&mut self, ordered: &[ItemId]) -> Result<ReorderReport, SessionError> {
        let schema = self.schema.clone();
        self.reorder_or_insert_with(ordered, |_| new_instance(&schema))
    }

    pub fn reorder_or_insert_with<F>(
        &mut self,
        ordered: &[ItemId],
        factory: F,
    ) -> Result<ReorderReport, SessionError>
    where
        F: FnMut(&ItemId) -> SubDocument,
    {
        self.ensure_open()?;
        let report = self.next.reorder_or_insert(ordered, factory);
        if let Some(active) = &self.active
            && !self.next.contains(active.id())
        {
            debug!(id = %active.id(), "active item removed");
            self.active = None;
        }
        self.evaluate_counts();
        Ok(report)
    }

    /// Drops one item. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: &ItemId) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if !self.next.contains(id) {
            return Ok(false);
        }
        let ordered: Vec<ItemId> = self
            .next
            .ids()
            .iter()
            .filter(|candidate| *candidate != id)
            .cloned()
            .collect();
        self.reorder_or_insert(&ordered)?;
        Ok(true)
    }

    /// Moves one item by `delta` positions. Returns `false` when it cannot move that far.
    pub fn move_item(&mut self, id: &ItemId, delta: isize) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let Some(index) = self.next.position(id) else {
            return Err(SessionError::UnknownItem(id.clone()));
        };
        let Some(target) = index.checked_add_signed(delta) else {
            return Ok(false);
        };
        if target >= self.next.len() || target == index {
            return Ok(false);
        }
        let mut ordered = self.next.ids().to_vec();
        let moved = ordered.remove(index);
        ordered.insert(target, moved);
        self.reorder_or_insert(&ordered)?;
        Ok(true)
    }

    /// Appends a default item and opens it. Returns `None` when the open item is invalid;
    /// if the renderer only reports that on the switch, the new item stays appended but
    /// unopened.
    pub fn add(&mut self) -> Result<Option<ItemId>, SessionError> {
        self.ensure_open()?;
        if !self.validate(true, false)? {
            return Ok(None);
        }
        let mut item = new_instance(&self.schema);
        item.assign_id(ItemId::generate());
        let id = self.next.push(item);
        debug!(id = %id, len = self.next.len(), "added item");
        let opened = self.select(&id)?;
        self.evaluate_counts();
        if !opened {
            debug!(id = %id, "added item was not opened; switch blocked");
            return Ok(None);
        }
        Ok(Some(id))
    }

    pub fn evaluate_counts(&mut self) -> CountState {
        self.counts = CountState::evaluate(self.next.len(), &self.constraints);
        self.counts
    }

    pub fn min_error(&self) -> bool {
        self.counts.min_error
    }

    pub fn max_error(&self) -> bool {
        self.counts.max_error
    }

    pub fn item_error(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveItem::has_errors)
    }

    pub fn is_session_valid(&self) -> bool {
        !(self.counts.is_blocking() || self.item_error())
    }

    /// `max` is defined and reached; the host disables "add" on this.
    pub fn maxed(&self) -> bool {
        self.constraints
            .max
            .is_some_and(|max| self.next.len() >= max)
    }

    /// The gate in front of `select`, `add` and `submit`. Warns the user and returns
    /// `false` when the requested checks find a blocking problem.
    pub fn validate(&mut self, check_item: bool, check_length: bool) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if check_item {
            self.trigger_validation = true;
            self.run_item_validation();
        }
        self.host.next_tick();
        if check_length {
            self.evaluate_counts();
        }
        let length_blocked = check_length && self.counts.is_blocking();
        let item_blocked = check_item && self.item_error();
        if length_blocked || item_blocked {
            debug!(
                min_error = self.counts.min_error,
                max_error = self.counts.max_error,
                item_error = item_blocked,
                "validation blocked action"
            );
            self.host.notify(&self.options.warning_key, &self.options.warning);
            return Ok(false);
        }
        Ok(true)
    }

    fn run_item_validation(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(reported) = self.host.validate_fields(active) {
            active.set_reported_errors(reported);
        }
        if self.options.validate_schema_fields {
            let errors = self.item_validator.check(active.form_state(), active.visibility());
            active.set_field_errors(errors);
        }
    }

    /// Whether closing now would lose anything: an unflushed edit, a length change, a
    /// reorder, or a field change against the baseline.
    pub fn is_modified(&self) -> bool {
        if let Some(active) = &self.active
            && let Some(stored) = self.next.get(active.id())
            && detect_doc_change(&self.schema, stored, active.form_state())
        {
            return true;
        }
        if self.next.len() != self.original.len() {
            return true;
        }
        self.next
            .iter()
            .zip(&self.original)
            .any(|(next, original)| {
                next.id() != original.id() || detect_doc_change(&self.schema, next, original)
            })
    }

    /// Validates everything, flushes the open item, stamps every item with its meta type
    /// and ends the session with the finalized list. Returns `None` when blocked.
    pub fn submit(&mut self) -> Result<Option<Vec<SubDocument>>, SessionError> {
        self.ensure_open()?;
        if !self.validate(true, true)? {
            return Ok(None);
        }
        self.flush_active_into_working_set();
        let scoped = self.field.scoped_array_name.as_deref();
        for id in self.next.ids().to_vec() {
            if let Some(item) = self.next.get_mut(&id) {
                item.stamp(&self.options.meta_type, scoped);
            }
        }
        let items = self.next.to_vec();
        self.active = None;
        self.finish(SessionEvent::ModalResult(items.clone()));
        Ok(Some(items))
    }

    /// Closes without saving when nothing changed, or when `confirm` approves discarding
    /// the changes. Returns whether the session closed.
    pub fn request_close<F>(&mut self, confirm: F) -> Result<bool, SessionError>
    where
        F: FnOnce() -> bool,
    {
        self.ensure_open()?;
        if self.is_modified() && !confirm() {
            return Ok(false);
        }
        self.emit_safe_close();
        Ok(true)
    }

    /// Unconditional discard.
    pub fn emit_safe_close(&mut self) {
        if self.phase == SessionPhase::Finished {
            return;
        }
        self.active = None;
        self.finish(SessionEvent::SafeClose);
    }

    fn finish(&mut self, event: SessionEvent) {
        debug!(submitted = matches!(event, SessionEvent::ModalResult(_)), "array session finished");
        self.phase = SessionPhase::Finished;
        self.outcome = Some(event);
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Finished {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }
}

impl<H> ArraySession<H> {
    pub fn working_set(&self) -> &WorkingSet {
        &self.next
    }

    pub fn baseline(&self) -> &[SubDocument] {
        &self.original
    }

    pub fn active(&self) -> Option<&ActiveItem> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&ItemId> {
        self.active.as_ref().map(ActiveItem::id)
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn counts(&self) -> CountState {
        self.counts
    }

    pub fn constraints(&self) -> CountConstraints {
        self.constraints
    }

    pub fn field(&self) -> &ArrayField {
        &self.field
    }

    pub fn schema(&self) -> &[FieldDefinition] {
        &self.schema
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Set once an item-level check has run; the form shows field errors from then on.
    pub fn validation_requested(&self) -> bool {
        self.trigger_validation
    }

    pub fn outcome(&self) -> Option<&SessionEvent> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<SessionEvent> {
        self.outcome
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Server-reported errors that target the open item, keyed by field name.
    pub fn active_server_errors(&self) -> Option<IndexMap<String, &ServerFieldError>> {
        let active = self.active_id()?;
        let mut errors = IndexMap::new();
        for error in self.server_error.as_ref()?.errors() {
            if let (id, Some(field)) = error.target()
                && id == active.as_str()
            {
                errors.insert(field.to_string(), error);
            }
        }
        (!errors.is_empty()).then_some(errors)
    }

    /// The host's `aposMeta` for the open item, or an empty map.
    pub fn active_meta(&self) -> Map<String, Value> {
        self.active_id()
            .and_then(|id| self.meta.get(id.as_str()))
            .and_then(|entry| entry.get("aposMeta"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;
    use crate::app::host::{NotifyOptions, NullHost};

    #[derive(Debug, Default)]
    struct Recorder {
        ticks: usize,
        notices: Vec<String>,
        scrolled: Vec<String>,
        field_errors: Option<bool>,
        queued_reports: VecDeque<bool>,
    }

    impl FormRenderer for Recorder {
        fn next_tick(&mut self) {
            self.ticks += 1;
        }

        fn validate_fields(&mut self, _item: &ActiveItem) -> Option<bool> {
            self.queued_reports.pop_front().or(self.field_errors)
        }

        fn scroll_field_into_view(&mut self, field: &str) {
            self.scrolled.push(field.to_string());
        }
    }

    impl Notifier for Recorder {
        fn notify(&mut self, message_key: &str, _options: &NotifyOptions) {
            self.notices.push(message_key.to_string());
        }
    }

    fn input(value: Value) -> SessionInput {
        serde_json::from_value(value).expect("input")
    }

    fn two_items() -> SessionInput {
        input(json!({
            "items": [{"_id": "a", "title": "A"}, {"_id": "b", "title": "B"}],
            "field": {"schema": [{"name": "title", "type": "string"}]}
        }))
    }

    fn session(input: SessionInput) -> ArraySession<Recorder> {
        ArraySession::new(input, SessionOptions::default(), Recorder::default())
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn initialize_assigns_ids_and_is_unmodified() {
        let s = ArraySession::new(
            input(json!({"items": [{"title": "x"}, {"title": "y"}], "field": {}})),
            SessionOptions::default(),
            NullHost,
        );
        assert_eq!(s.working_set().len(), 2);
        assert!(s.working_set().ids().iter().all(|id| !id.is_empty()));
        assert_eq!(s.baseline()[0].id(), s.working_set().ids().first().expect("id"));
        assert!(!s.is_modified());
        assert!(s.active().is_none());
    }

    #[test]
    fn select_opens_item_through_the_barrier() {
        let mut s = session(two_items());
        let step = s.begin_select(&ItemId::from("b")).expect("begin");
        let SelectStep::Pending(pending) = step else {
            panic!("expected pending switch, got {step:?}");
        };
        assert!(s.active().is_none());
        assert_eq!(
            s.phase(),
            &SessionPhase::Switching {
                target: ItemId::from("b")
            }
        );
        assert!(s.complete_select(pending).expect("complete"));
        assert_eq!(s.active_id().map(ItemId::as_str), Some("b"));
        assert_eq!(s.phase(), &SessionPhase::Editing);
        assert!(!s.validation_requested());
    }

    #[test]
    fn selecting_the_active_item_is_a_no_op() {
        let mut s = session(two_items());
        assert!(s.select(&ItemId::from("a")).expect("select"));
        let ticks = s.host().ticks;
        assert_eq!(
            s.begin_select(&ItemId::from("a")).expect("again"),
            SelectStep::AlreadyActive
        );
        assert_eq!(s.host().ticks, ticks);
    }

    #[test]
    fn select_unknown_id_is_an_error() {
        let mut s = session(two_items());
        assert_eq!(
            s.select(&ItemId::from("nope")),
            Err(SessionError::UnknownItem(ItemId::from("nope")))
        );
    }

    #[test]
    fn invalid_active_item_blocks_select() {
        let mut s = session(two_items());
        s.select(&ItemId::from("a")).expect("select");
        s.update_active_item(fields(json!({"title": "edited"})), true)
            .expect("update");
        assert!(!s.select(&ItemId::from("b")).expect("select"));
        assert_eq!(s.active_id().map(ItemId::as_str), Some("a"));
        assert_eq!(
            s.working_set().get(&ItemId::from("a")).and_then(|d| d.get("title")),
            Some(&json!("A"))
        );
        assert_eq!(s.host().notices, vec![crate::app::options::RESOLVE_ERRORS_KEY]);
    }

    #[test]
    fn switching_flushes_the_previous_item() {
        let mut s = session(two_items());
        s.select(&ItemId::from("a")).expect("select");
        s.update_active_item(fields(json!({"title": "edited"})), false)
            .expect("update");
        assert_eq!(
            s.current_field_value("title").expect("value"),
            Some(&json!("edited"))
        );
        assert!(s.is_modified());
        assert!(s.select(&ItemId::from("b")).expect("select"));
        assert_eq!(
            s.working_set().get(&ItemId::from("a")).and_then(|d| d.get("title")),
            Some(&json!("edited"))
        );
    }

    #[test]
    fn stale_barrier_is_rejected() {
        let mut s = session(two_items());
        let SelectStep::Pending(first) = s.begin_select(&ItemId::from("a")).expect("a") else {
            panic!("pending");
        };
        let SelectStep::Pending(second) = s.begin_select(&ItemId::from("b")).expect("b") else {
            panic!("pending");
        };
        assert!(matches!(
            s.complete_select(first),
            Err(SessionError::UnexpectedBarrier { .. })
        ));
        assert!(s.complete_select(second).expect("second"));
        assert_eq!(s.active_id().map(ItemId::as_str), Some("b"));
    }

    #[test]
    fn removing_switch_target_mid_flight_leaves_nothing_open() {
        let mut s = session(two_items());
        let SelectStep::Pending(pending) = s.begin_select(&ItemId::from("b")).expect("b") else {
            panic!("pending");
        };
        assert!(s.remove(&ItemId::from("b")).expect("remove"));
        assert!(!s.complete_select(pending).expect("complete"));
        assert!(s.active().is_none());
    }

    #[test]
    fn current_field_value_requires_an_open_item() {
        let s = session(two_items());
        assert_eq!(s.current_field_value("title"), Err(SessionError::NoActiveItem));
    }

    #[test]
    fn removing_the_active_item_clears_it() {
        let mut s = session(two_items());
        s.select(&ItemId::from("a")).expect("select");
        assert!(s.remove(&ItemId::from("a")).expect("remove"));
        assert!(s.active().is_none());
        assert_eq!(s.working_set().len(), 1);
        assert!(s.is_modified());
    }

    #[test]
    fn move_item_shifts_position() {
        let mut s = session(two_items());
        assert!(s.move_item(&ItemId::from("a"), 1).expect("move"));
        assert_eq!(s.working_set().ids()[0].as_str(), "b");
        assert!(!s.move_item(&ItemId::from("a"), 1).expect("edge"));
        assert!(!s.move_item(&ItemId::from("b"), -1).expect("edge"));
    }

    #[test]
    fn add_appends_and_opens_a_default_item() {
        let mut s = session(input(json!({
            "items": [{"_id": "a", "title": "A"}],
            "field": {"schema": [{"name": "title", "type": "string", "def": "New"}]}
        })));
        let id = s.add().expect("add").expect("added");
        assert_eq!(s.working_set().len(), 2);
        assert_eq!(s.active_id(), Some(&id));
        assert_eq!(s.current_field_value("title").expect("value"), Some(&json!("New")));
    }

    #[test]
    fn renderer_reported_errors_block_validation() {
        let mut s = session(two_items());
        s.select(&ItemId::from("a")).expect("select");
        s.host_mut().field_errors = Some(true);
        assert!(!s.validate(true, false).expect("validate"));
        assert!(s.item_error());
        s.host_mut().field_errors = Some(false);
        assert!(s.validate(true, false).expect("validate"));
    }

    #[test]
    fn schema_errors_follow_updates_once_validation_ran() {
        let mut s = session(input(json!({
            "items": [{"_id": "a", "title": "A"}],
            "field": {"schema": [{"name": "title", "type": "string", "required": true}]}
        })));
        s.select(&ItemId::from("a")).expect("select");
        s.update_active_item(fields(json!({"title": ""})), false)
            .expect("update");
        assert!(!s.item_error(), "errors stay hidden until validation is requested");
        assert!(!s.validate(true, false).expect("validate"));
        assert_eq!(
            s.active().map(|a| a.field_errors().contains_key("title")),
            Some(true)
        );
        s.update_active_item(fields(json!({"title": "fixed"})), false)
            .expect("update");
        assert!(!s.item_error());
    }

    #[test]
    fn finished_session_rejects_mutation() {
        let mut s = session(two_items());
        s.emit_safe_close();
        assert_eq!(s.outcome(), Some(&SessionEvent::SafeClose));
        assert_eq!(s.add(), Err(SessionError::SessionClosed));
        assert_eq!(s.submit(), Err(SessionError::SessionClosed));
    }

    #[test]
    fn request_close_asks_only_when_modified() {
        let mut clean = session(two_items());
        assert!(clean.request_close(|| panic!("no prompt expected")).expect("close"));

        let mut dirty = session(two_items());
        dirty.remove(&ItemId::from("a")).expect("remove");
        assert!(!dirty.request_close(|| false).expect("declined"));
        assert!(dirty.outcome().is_none());
        assert!(dirty.request_close(|| true).expect("approved"));
        assert_eq!(dirty.outcome(), Some(&SessionEvent::SafeClose));
    }

    #[test]
    fn server_errors_and_meta_follow_the_active_item() {
        let mut s = session(input(json!({
            "items": [{"_id": "a"}, {"_id": "b"}],
            "field": {"schema": [{"name": "title", "type": "string"}]},
            "serverError": {"data": {"errors": [
                {"path": "b.title", "message": "taken"},
                {"path": "a.title", "message": "other"}
            ]}},
            "meta": {"b": {"aposMeta": {"locked": true}}}
        })));
        s.mount().expect("mount");
        assert_eq!(s.active_id().map(ItemId::as_str), Some("b"));
        assert_eq!(s.host().scrolled, vec!["title".to_string()]);
        let errors = s.active_server_errors().expect("errors");
        assert_eq!(
            errors.get("title").and_then(|e| e.message.as_deref()),
            Some("taken")
        );
        assert_eq!(s.active_meta().get("locked"), Some(&json!(true)));
    }

    #[test]
    fn mount_ignores_server_errors_for_unknown_items() {
        let mut s = session(input(json!({
            "items": [{"_id": "a"}],
            "field": {},
            "serverError": {"data": {"errors": [{"path": "zzz.title"}]}}
        })));
        s.mount().expect("mount");
        assert_eq!(s.active_id().map(ItemId::as_str), Some("a"));
        assert!(s.host().scrolled.is_empty());
    }

    #[test]
    fn add_reports_none_when_the_switch_is_blocked() {
        let mut s = session(two_items());
        s.mount().expect("mount");
        s.host_mut().queued_reports = VecDeque::from([false, true]);
        assert_eq!(s.add().expect("add"), None);
        assert_eq!(s.working_set().len(), 3);
        assert_eq!(s.active_id().map(ItemId::as_str), Some("a"));
        assert_eq!(s.phase(), &SessionPhase::Editing);
    }

    #[test]
    fn field_changes_and_switches_reevaluate_conditions() {
        let mut s = session(input(json!({
            "items": [
                {"_id": "a", "linkType": "external"},
                {"_id": "b", "linkType": "external", "url": "https://example.com"}
            ],
            "field": {"schema": [
                {"name": "linkType", "type": "select", "def": "page",
                 "choices": [{"value": "page"}, {"value": "external"}]},
                {"name": "url", "type": "url", "required": true, "if": {"linkType": "external"}}
            ]}
        })));
        s.mount().expect("mount");
        let active = s.active().expect("active");
        assert!(active.is_visible("url"));
        assert!(!s.validate(true, false).expect("validate"));
        assert!(s.active().expect("active").field_errors().contains_key("url"));

        s.update_active_item(fields(json!({"linkType": "page"})), false)
            .expect("update");
        assert!(!s.active().expect("active").is_visible("url"));
        assert!(s.validate(true, false).expect("validate"));

        assert!(s.select(&ItemId::from("b")).expect("select"));
        assert!(s.active().expect("active").is_visible("url"));
        assert_eq!(s.host().notices.len(), 1);
    }
}
