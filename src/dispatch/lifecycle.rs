//! The work order state machine
//!
//! Every mutating operation follows the same shape:
//!
//! 1. validate the input (no lock needed)
//! 2. take the per-id lock and load the current record
//! 3. check the transition table and the business rules
//! 4. commit through [`WorkOrderRepository::replace_if_status`], which also
//!    appends the history entry
//! 5. release the lock, publish the event and send notifications
//!
//! Nothing is written before every check passed, so a failed call leaves no
//! trace. Notification failures after a commit are returned as warnings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use validator::Validate;

use super::catalog::CatalogService;
use super::ids::IdGenerator;
use super::locks::KeyedLocks;
use super::matcher::ContractorMatcher;
use super::notify::NotificationDispatcher;
use super::search::SearchIndex;
use crate::config::AssignmentConfig;
use crate::core::error::{
    DependencyError, DispatchError, DispatchResult, LifecycleError, StorageError,
};
use crate::core::events::{DispatchEvent, EventBus};
use crate::core::service::WorkOrderRepository;
use crate::core::validation::validators::not_blank;
use crate::entities::{
    AssignmentAttempt, AssignmentType, AttemptStatus, AutomationStatus, CatalogKind,
    ContractorAssignment, ContractorCandidate, LifecycleEntry, NewWorkOrder, Notification,
    NotificationRecord, Transition, WorkOrder, WorkOrderPatch, WorkOrderStatus, compose,
};

/// Ids are retried this many times when a generated one is already taken
const MAX_ID_ATTEMPTS: usize = 16;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of a mutation that also tried to notify someone
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub work_order: WorkOrder,
    pub warnings: Vec<DependencyError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn transition(self) -> Transition {
        match self {
            Decision::Accept => Transition::Accept,
            Decision::Reject => Transition::Reject,
        }
    }
}

/// A contractor's answer to an assignment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContractorResponse {
    #[validate(custom(function = "not_blank"))]
    pub contractor_id: String,
    pub decision: Decision,
    #[serde(default)]
    pub remark: Option<String>,
    /// Unix seconds from the response link; must match the current assignment
    #[serde(default)]
    pub issued_at: Option<i64>,
}

/// Auto assignment bookkeeping of one work order
///
/// Kept for the lifetime of the engine, like the in-memory repository records.
#[derive(Debug, Default)]
struct Automation {
    stopped: bool,
    attempts: Vec<AssignmentAttempt>,
}

impl Automation {
    fn tried(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.contractor_id.clone()).collect()
    }
}

/// Coordinates repository, matcher and notifications around the state machine
pub struct LifecycleEngine {
    repository: Arc<dyn WorkOrderRepository>,
    catalog: CatalogService,
    matcher: ContractorMatcher,
    search: SearchIndex,
    notifications: NotificationDispatcher,
    events: EventBus,
    ids: IdGenerator,
    locks: KeyedLocks,
    assignment: AssignmentConfig,
    strict_catalog: bool,
    automation: Mutex<HashMap<String, Automation>>,
    clock: Clock,
}

impl LifecycleEngine {
    pub fn new(
        repository: Arc<dyn WorkOrderRepository>,
        catalog: CatalogService,
        matcher: ContractorMatcher,
        notifications: NotificationDispatcher,
        events: EventBus,
        assignment: AssignmentConfig,
    ) -> Self {
        Self {
            search: SearchIndex::new(Arc::clone(&repository)),
            repository,
            catalog,
            matcher,
            notifications,
            events,
            ids: IdGenerator::new(),
            locks: KeyedLocks::new(),
            assignment,
            strict_catalog: false,
            automation: Mutex::new(HashMap::new()),
            clock: Arc::new(Utc::now),
        }
    }

    /// Reject types and areas that are not active catalog entries
    pub fn with_strict_catalog(mut self, strict: bool) -> Self {
        self.strict_catalog = strict;
        self
    }

    /// Replace the time source (tests use this to move past link expiry)
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn matcher(&self) -> &ContractorMatcher {
        &self.matcher
    }

    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------
    // Creation and reads
    // ------------------------------------------------------------------

    /// Reserve an id for a work order of `primary_type`
    pub async fn generate_id(&self, primary_type: &str, child: bool) -> DispatchResult<String> {
        let now = self.now();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next(primary_type, child, now)?;
            if !self.repository.contains(&id).await? {
                return Ok(id);
            }
        }
        Err(StorageError::IntegrityError {
            message: "no unused work order id available".to_string(),
        }
        .into())
    }

    pub async fn create(&self, new: NewWorkOrder) -> DispatchResult<WorkOrder> {
        new.validate()?;
        let Some(requested_closing_time) = new.requested_closing_time else {
            return Err(DispatchError::field(
                "requested_closing_time",
                "requested closing time is required",
            ));
        };
        let types = new.normalized_types();
        let area = new.area.trim().to_string();
        if self.strict_catalog {
            self.check_catalog(&types, &area).await?;
        }

        // Holding the parent's lock keeps a concurrent close from missing this child
        let parent_id = new.parent_id().map(str::to_string);
        let _parent_guard = match &parent_id {
            Some(parent_id) => {
                let guard = self.locks.lock(parent_id).await?;
                self.check_parent(parent_id).await?;
                Some(guard)
            }
            None => None,
        };
        let child = parent_id.is_some();

        // A reserved W id without a parent is a child waiting to be mapped
        let id = match new.id.as_deref().map(str::trim) {
            Some(reserved) => {
                if child && reserved.chars().nth(8) != Some('W') {
                    return Err(DispatchError::field(
                        "id",
                        "a child work order id must carry 'W'",
                    ));
                }
                reserved.to_string()
            }
            None => {
                let primary = types.first().map(String::as_str).unwrap_or_default();
                self.generate_id(primary, child).await?
            }
        };

        let work_order = WorkOrder {
            id,
            rate: compose(types.as_slice(), &new.rate),
            types,
            area,
            client: new.client.trim().to_string(),
            status: WorkOrderStatus::Open,
            requested_closing_time,
            remarks: new.remarks,
            assignment_type: new.assignment_type,
            contractor: None,
            parent_id,
            opening_images: new.opening_images,
            closing_images: Vec::new(),
            created_at: self.now(),
        };
        let work_order = self.repository.insert(work_order).await?;

        info!(
            work_order_id = %work_order.id,
            parent_id = ?work_order.parent_id,
            total = work_order.rate.total,
            "work order created"
        );
        self.events.publish(DispatchEvent::WorkOrderCreated {
            work_order_id: work_order.id.clone(),
            parent_id: work_order.parent_id.clone(),
        });
        Ok(work_order)
    }

    async fn check_catalog(&self, types: &[String], area: &str) -> DispatchResult<()> {
        for ty in types {
            if !self.catalog.is_active_name(CatalogKind::Type, ty).await? {
                return Err(DispatchError::field(
                    "types",
                    format!("'{}' is not an active work order type", ty),
                ));
            }
        }
        if !self.catalog.is_active_name(CatalogKind::Area, area).await? {
            return Err(DispatchError::field(
                "area",
                format!("'{}' is not an active work order area", area),
            ));
        }
        Ok(())
    }

    async fn check_parent(&self, parent_id: &str) -> DispatchResult<WorkOrder> {
        let parent = self.load(parent_id).await?;
        if !parent.can_have_children() {
            return Err(LifecycleError::PreconditionFailed {
                id: parent.id,
                reason: "child work orders cannot have children".to_string(),
                blocking: Vec::new(),
            }
            .into());
        }
        if parent.status.is_terminal() {
            return Err(LifecycleError::InvalidState {
                id: parent.id,
                status: parent.status,
                operation: "add child to".to_string(),
            }
            .into());
        }
        Ok(parent)
    }

    async fn load(&self, id: &str) -> DispatchResult<WorkOrder> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DispatchError::work_order_not_found(id))
    }

    pub async fn get(&self, id: &str) -> DispatchResult<WorkOrder> {
        self.load(id).await
    }

    /// Patch client, remarks or requested closing time
    pub async fn update(&self, id: &str, patch: WorkOrderPatch) -> DispatchResult<WorkOrder> {
        patch.validate()?;
        let _guard = self.locks.lock(id).await?;
        let updated = self.repository.update(id, patch).await?;
        info!(work_order_id = %updated.id, "work order updated");
        self.events.publish(DispatchEvent::WorkOrderUpdated {
            work_order_id: updated.id.clone(),
        });
        Ok(updated)
    }

    /// Children in creation order; the parent must exist
    pub async fn list_children(&self, parent_id: &str) -> DispatchResult<Vec<WorkOrder>> {
        self.load(parent_id).await?;
        self.repository.list_children(parent_id).await
    }

    pub async fn history(&self, id: &str) -> DispatchResult<Vec<LifecycleEntry>> {
        self.repository.history(id).await
    }

    pub async fn notifications(&self, id: &str) -> DispatchResult<Vec<NotificationRecord>> {
        self.load(id).await?;
        self.notifications.log_for(id)
    }

    /// Eligible contractors for a work order, cheapest first
    pub async fn candidates(&self, id: &str) -> DispatchResult<Vec<ContractorCandidate>> {
        let work_order = self.load(id).await?;
        self.matcher.candidates_for(&work_order).await
    }

    // ------------------------------------------------------------------
    // Parent / child mapping
    // ------------------------------------------------------------------

    /// Root work orders that can still take children, in creation order
    pub async fn list_parents(&self) -> DispatchResult<Vec<WorkOrder>> {
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(|wo| wo.can_have_children() && !wo.status.is_terminal())
            .collect())
    }

    /// Unmapped child work orders [`map_children`](Self::map_children) accepts for `parent_id`
    pub async fn eligible_children(&self, parent_id: &str) -> DispatchResult<Vec<WorkOrder>> {
        let parent = self.load(parent_id).await?;
        Ok(self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(|wo| Self::mapping_conflict(&parent, wo).is_none())
            .collect())
    }

    /// Why `child` cannot be mapped to `parent`, if it cannot
    fn mapping_conflict(parent: &WorkOrder, child: &WorkOrder) -> Option<String> {
        if !child.has_child_id() {
            return Some("not a child work order".to_string());
        }
        if let Some(existing) = &child.parent_id {
            return Some(format!("mapped to {}", existing));
        }
        if !child.area.trim().eq_ignore_ascii_case(parent.area.trim()) {
            return Some(format!("area {} differs", child.area));
        }
        let outside: Vec<&str> = child
            .types
            .iter()
            .filter(|ty| !parent.types.iter().any(|p| p.eq_ignore_ascii_case(ty)))
            .map(String::as_str)
            .collect();
        if !outside.is_empty() {
            return Some(format!("types {} not on the parent", outside.join(", ")));
        }
        None
    }

    /// Attach existing unmapped child work orders to a parent
    ///
    /// Runs under the parent's lock (as child creation does) and the
    /// children's locks, taken in id order. Children already mapped to this
    /// parent are skipped; any other ineligible child fails the whole call.
    /// Returns every child of the parent afterwards.
    pub async fn map_children(
        &self,
        parent_id: &str,
        child_ids: Vec<String>,
    ) -> DispatchResult<Vec<WorkOrder>> {
        let mut child_ids: Vec<String> = child_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        child_ids.sort();
        child_ids.dedup();
        if child_ids.is_empty() {
            return Err(DispatchError::field(
                "child_ids",
                "at least one child work order is required",
            ));
        }
        if child_ids.iter().any(|id| id == parent_id) {
            return Err(DispatchError::field(
                "child_ids",
                "a work order cannot be its own child",
            ));
        }

        let _parent_guard = self.locks.lock(parent_id).await?;
        let parent = self.check_parent(parent_id).await?;
        let mut child_guards = Vec::with_capacity(child_ids.len());
        for id in &child_ids {
            child_guards.push(self.locks.lock(id).await?);
        }

        let mut to_attach = Vec::new();
        let mut blocking = Vec::new();
        for id in &child_ids {
            let child = self.load(id).await?;
            if child.parent_id.as_deref() == Some(parent_id) {
                continue;
            }
            match Self::mapping_conflict(&parent, &child) {
                Some(reason) => blocking.push(format!("{} ({})", child.id, reason)),
                None => to_attach.push(child.id),
            }
        }
        if !blocking.is_empty() {
            return Err(LifecycleError::PreconditionFailed {
                id: parent.id,
                reason: "children not eligible for mapping".to_string(),
                blocking,
            }
            .into());
        }

        if !to_attach.is_empty() {
            self.repository.attach_children(parent_id, &to_attach).await?;
            info!(
                parent_id,
                children = ?to_attach,
                "children mapped"
            );
            self.events.publish(DispatchEvent::ChildrenMapped {
                parent_id: parent_id.to_string(),
                child_ids: to_attach,
            });
        }
        self.repository.list_children(parent_id).await
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn target(work_order: &WorkOrder, transition: Transition) -> DispatchResult<WorkOrderStatus> {
        work_order.status.apply(transition).ok_or_else(|| {
            LifecycleError::InvalidState {
                id: work_order.id.clone(),
                status: work_order.status,
                operation: transition.to_string(),
            }
            .into()
        })
    }

    /// Write `updated` if the stored status is still `from`, then announce it
    async fn commit(
        &self,
        from: WorkOrderStatus,
        updated: WorkOrder,
        entry: LifecycleEntry,
    ) -> DispatchResult<WorkOrder> {
        let transition = entry.transition;
        let committed = self.repository.replace_if_status(from, updated, entry).await?;
        info!(
            work_order_id = %committed.id,
            %transition,
            from = %from,
            to = %committed.status,
            "work order transition"
        );
        self.events.publish(DispatchEvent::StatusChanged {
            work_order_id: committed.id.clone(),
            from,
            to: committed.status,
        });
        Ok(committed)
    }

    /// Assign a contractor to an OPEN work order
    ///
    /// The assignment is committed first; the acceptance request is sent
    /// afterwards and a failure comes back in `warnings`.
    pub async fn assign(
        &self,
        id: &str,
        contractor: ContractorAssignment,
    ) -> DispatchResult<AssignmentOutcome> {
        if not_blank(&contractor.name).is_err() {
            return Err(DispatchError::field("contractor.name", "must not be blank"));
        }
        let (work_order, issued_at) = {
            let _guard = self.locks.lock(id).await?;
            let current = self.load(id).await?;
            self.assign_locked(current, contractor).await?
        };
        Ok(self.request_acceptance(work_order, issued_at).await)
    }

    /// Assign by contractor id, priced with the client's standard rate
    pub async fn assign_contractor(
        &self,
        id: &str,
        contractor_id: &str,
    ) -> DispatchResult<AssignmentOutcome> {
        let contractor = self.matcher.resolve(contractor_id.trim()).await?;
        let work_order = self.load(id).await?;
        let rate = self.matcher.rate_for(&contractor, &work_order).await?;
        self.assign(
            id,
            ContractorAssignment {
                id: contractor.id,
                name: contractor.name,
                email: contractor.email,
                rate,
            },
        )
        .await
    }

    async fn assign_locked(
        &self,
        current: WorkOrder,
        contractor: ContractorAssignment,
    ) -> DispatchResult<(WorkOrder, DateTime<Utc>)> {
        let to = Self::target(&current, Transition::Assign)?;
        let from = current.status;

        let mut updated = current;
        updated.status = to;
        updated.contractor = Some(contractor.clone());

        let entry = LifecycleEntry::new(Transition::Assign, from, to)
            .with_contractor(contractor.id.clone())
            .at(self.now());
        let issued_at = entry.at;
        let committed = self.commit(from, updated, entry).await?;
        self.events.publish(DispatchEvent::ContractorAssigned {
            work_order_id: committed.id.clone(),
            contractor_id: contractor.id,
        });
        Ok((committed, issued_at))
    }

    async fn request_acceptance(
        &self,
        work_order: WorkOrder,
        issued_at: DateTime<Utc>,
    ) -> AssignmentOutcome {
        let mut warnings = Vec::new();
        if let Some(contractor) = &work_order.contractor {
            let expires_at = self.link_expires_at(issued_at, &work_order.area);
            let sent = self
                .notifications
                .assignment_request(&work_order, contractor, issued_at, expires_at);
            if let Err(e) = self.send(sent).await {
                warnings.push(e);
            }
        }
        AssignmentOutcome {
            work_order,
            warnings,
        }
    }

    /// End of a response link's lifetime; saturates instead of overflowing
    fn link_expires_at(&self, issued_at: DateTime<Utc>, area: &str) -> DateTime<Utc> {
        issued_at
            .checked_add_signed(self.assignment.link_expiry(area))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn send(
        &self,
        rendered: Result<Notification, DependencyError>,
    ) -> Result<(), DependencyError> {
        match rendered {
            Ok(notification) => self.notifications.deliver(&notification).await,
            Err(e) => {
                warn!(error = %e, "notification could not be rendered");
                Err(e)
            }
        }
    }

    /// Assign the cheapest contractor not tried before for this work order
    pub async fn auto_assign(&self, id: &str) -> DispatchResult<AssignmentOutcome> {
        let (work_order, issued_at) = {
            let _guard = self.locks.lock(id).await?;
            let current = self.load(id).await?;
            if current.assignment_type != AssignmentType::Auto {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: "work order uses manual assignment".to_string(),
                    blocking: Vec::new(),
                }
                .into());
            }
            Self::target(&current, Transition::Assign)?;

            let (stopped, tried) = self.with_automation(id, |a| (a.stopped, a.tried()))?;
            if stopped {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: "auto assignment was stopped".to_string(),
                    blocking: tried,
                }
                .into());
            }
            if tried.len() >= self.assignment.max_auto_attempts as usize {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: format!(
                        "auto assignment gave up after {} attempts",
                        self.assignment.max_auto_attempts
                    ),
                    blocking: tried,
                }
                .into());
            }

            let candidate = self
                .matcher
                .candidates_for(&current)
                .await?
                .into_iter()
                .find(|c| !tried.contains(&c.contractor_id));
            let Some(candidate) = candidate else {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: format!("no untried contractor serves area '{}'", current.area),
                    blocking: tried,
                }
                .into());
            };

            let (work_order, issued_at) =
                self.assign_locked(current, candidate.to_assignment()).await?;
            self.with_automation(id, |a| {
                let number = a.attempts.len() as u32 + 1;
                a.attempts
                    .push(AssignmentAttempt::pending(id, &candidate, number, issued_at));
            })?;
            (work_order, issued_at)
        };
        Ok(self.request_acceptance(work_order, issued_at).await)
    }

    fn automation_table(&self) -> DispatchResult<MutexGuard<'_, HashMap<String, Automation>>> {
        self.automation
            .lock()
            .map_err(|_| StorageError::poisoned("auto assignment attempts").into())
    }

    fn with_automation<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Automation) -> T,
    ) -> DispatchResult<T> {
        let mut table = self.automation_table()?;
        Ok(f(table.entry(id.to_string()).or_default()))
    }

    /// Auto assignment attempts of a work order, oldest first
    pub async fn assignment_attempts(&self, id: &str) -> DispatchResult<Vec<AssignmentAttempt>> {
        self.load(id).await?;
        Ok(self
            .automation_table()?
            .get(id)
            .map(|a| a.attempts.clone())
            .unwrap_or_default())
    }

    /// Switch auto assignment off for a work order
    ///
    /// Pending attempts become `STOPPED`; the current assignment itself is
    /// kept. Later `auto_assign` calls fail while manual assignment keeps
    /// working. Stopping twice is harmless.
    pub async fn stop_automation(&self, id: &str) -> DispatchResult<AutomationStatus> {
        let _guard = self.locks.lock(id).await?;
        let current = self.load(id).await?;
        if current.assignment_type != AssignmentType::Auto {
            return Err(LifecycleError::PreconditionFailed {
                id: current.id,
                reason: "work order uses manual assignment".to_string(),
                blocking: Vec::new(),
            }
            .into());
        }

        let now = self.now();
        let (newly_stopped, attempts) = self.with_automation(id, |a| {
            let newly_stopped = !a.stopped;
            a.stopped = true;
            for attempt in &mut a.attempts {
                attempt.settle(
                    AttemptStatus::Stopped,
                    Some("automation stopped".to_string()),
                    now,
                );
            }
            (newly_stopped, a.attempts.clone())
        })?;

        if newly_stopped {
            info!(work_order_id = %current.id, "auto assignment stopped");
            self.events.publish(DispatchEvent::AutomationStopped {
                work_order_id: current.id.clone(),
            });
        }
        Ok(AutomationStatus {
            work_order_id: current.id,
            stopped: true,
            attempts,
        })
    }

    /// Record the assigned contractor's accept / reject answer
    pub async fn respond(
        &self,
        id: &str,
        response: ContractorResponse,
    ) -> DispatchResult<AssignmentOutcome> {
        let contractor_id = response.contractor_id.trim().to_string();
        if contractor_id.is_empty() {
            return Err(DispatchError::field("contractor_id", "must not be blank"));
        }
        let transition = response.decision.transition();

        let committed = {
            let _guard = self.locks.lock(id).await?;
            let current = self.load(id).await?;
            let to = Self::target(&current, transition)?;
            let from = current.status;

            let assigned = current
                .contractor
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_default();
            if assigned != contractor_id {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: format!("contractor '{}' is not assigned to this work order", contractor_id),
                    blocking: vec![assigned],
                }
                .into());
            }

            let assigned_at = self.assigned_at(id).await?;
            if let Some(issued_at) = response.issued_at {
                if issued_at != assigned_at.timestamp() {
                    return Err(LifecycleError::PreconditionFailed {
                        id: current.id,
                        reason: "response link does not belong to the current assignment".to_string(),
                        blocking: Vec::new(),
                    }
                    .into());
                }
            }
            if self.now() > self.link_expires_at(assigned_at, &current.area) {
                return Err(LifecycleError::PreconditionFailed {
                    id: current.id,
                    reason: "response link expired".to_string(),
                    blocking: Vec::new(),
                }
                .into());
            }

            let mut updated = current;
            updated.status = to;
            let at = self.now();
            let entry = LifecycleEntry::new(transition, from, to)
                .with_contractor(contractor_id.clone())
                .with_remark(response.remark.clone())
                .at(at);
            let committed = self.commit(from, updated, entry).await?;

            let outcome = match response.decision {
                Decision::Accept => AttemptStatus::Accepted,
                Decision::Reject => AttemptStatus::Rejected,
            };
            if let Some(automation) = self.automation_table()?.get_mut(id) {
                automation
                    .attempts
                    .iter_mut()
                    .filter(|attempt| attempt.contractor_id == contractor_id)
                    .for_each(|attempt| attempt.settle(outcome, response.remark.clone(), at));
            }
            committed
        };

        let mut warnings = Vec::new();
        if let Some(contractor) = &committed.contractor {
            let rendered = self.notifications.response_recorded(
                &committed,
                contractor,
                response.decision == Decision::Accept,
                response.remark.as_deref(),
            );
            if let Err(e) = self.send(rendered).await {
                warnings.push(e);
            }
        }
        Ok(AssignmentOutcome {
            work_order: committed,
            warnings,
        })
    }

    async fn assigned_at(&self, id: &str) -> DispatchResult<DateTime<Utc>> {
        self.repository
            .history(id)
            .await?
            .iter()
            .rev()
            .find(|e| e.transition == Transition::Assign)
            .map(|e| e.at)
            .ok_or_else(|| {
                StorageError::IntegrityError {
                    message: format!("assigned work order '{}' has no assignment entry", id),
                }
                .into()
            })
    }

    /// REJECTED back to OPEN, dropping the contractor
    pub async fn reopen(&self, id: &str) -> DispatchResult<WorkOrder> {
        let _guard = self.locks.lock(id).await?;
        let current = self.load(id).await?;
        let to = Self::target(&current, Transition::Reopen)?;
        let from = current.status;

        let mut updated = current;
        let previous = updated.contractor.take();
        updated.status = to;
        let mut entry = LifecycleEntry::new(Transition::Reopen, from, to).at(self.now());
        if let Some(previous) = previous {
            entry = entry.with_contractor(previous.id);
        }
        self.commit(from, updated, entry).await
    }

    /// ACCEPTED to IN_PROGRESS
    pub async fn start(&self, id: &str) -> DispatchResult<WorkOrder> {
        let _guard = self.locks.lock(id).await?;
        let current = self.load(id).await?;
        let to = Self::target(&current, Transition::Start)?;
        let from = current.status;

        let mut updated = current;
        updated.status = to;
        let mut entry = LifecycleEntry::new(Transition::Start, from, to).at(self.now());
        if let Some(contractor) = &updated.contractor {
            entry = entry.with_contractor(contractor.id.clone());
        }
        self.commit(from, updated, entry).await
    }

    /// Close from OPEN or IN_PROGRESS with closing evidence
    ///
    /// Checked in order: evidence present, work order exists, status allows
    /// closing, every child CLOSED.
    pub async fn close(&self, id: &str, closing_images: Vec<String>) -> DispatchResult<WorkOrder> {
        let closing_images: Vec<String> = closing_images
            .into_iter()
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty())
            .collect();
        if closing_images.is_empty() {
            return Err(DispatchError::field(
                "closing_images",
                "closing evidence required",
            ));
        }

        let _guard = self.locks.lock(id).await?;
        let current = self.load(id).await?;
        let to = Self::target(&current, Transition::Close)?;
        let from = current.status;

        let blocking: Vec<String> = self
            .repository
            .list_children(id)
            .await?
            .iter()
            .filter(|child| child.status != WorkOrderStatus::Closed)
            .map(|child| format!("{} ({})", child.id, child.status))
            .collect();
        if !blocking.is_empty() {
            return Err(LifecycleError::PreconditionFailed {
                id: current.id,
                reason: "open children exist".to_string(),
                blocking,
            }
            .into());
        }

        let mut updated = current;
        updated.status = to;
        updated.closing_images.extend(closing_images);
        let entry = LifecycleEntry::new(Transition::Close, from, to).at(self.now());
        self.commit(from, updated, entry).await
    }
}
