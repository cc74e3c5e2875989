//! The service lifecycle broker.
//!
//! **Architecture**: one `Mutex` guards the whole record table; every
//! record's fields are mutated only while that lock is held. The lock is
//! never held across a spawn: the broker decides and records intent inside
//! the critical section, releases it, and lets the worker task's eventual
//! `attach` re-acquire the lock to finalize state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use svclite_shared::constants::status;
use svclite_shared::{
    AttachToken, ConnectionEvent, RemoteHandle, ServiceKey, SvcliteError, SvcliteResult,
};

use crate::launcher::{LaunchCommand, ProcessLauncher};
use crate::pkg::{self, PackageRecord, PackageResolver};

use super::options::{BrokerOptions, ServiceOptions};
use super::record::{RemovalHandle, ServiceInfo, ServiceRecord};
use super::registry::Subscriber;

/// Identity of the process invoking a broker operation.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub uid: u32,
    pub pid: u32,
}

/// Outcome of a create/attach request. Both variants are success; the
/// distinction is informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    /// An existing record was joined (already attached or spawn in flight).
    Reused,

    /// A fresh spawn was scheduled for this request.
    SpawnScheduled,
}

impl RequestStatus {
    pub fn wire_code(self) -> i32 {
        status::OK
    }
}

/// Outcome of a removal request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveStatus {
    Removed,
    NotFound,
}

impl RemoveStatus {
    pub fn wire_code(self) -> i32 {
        match self {
            RemoveStatus::Removed => status::OK,
            RemoveStatus::NotFound => status::NOT_FOUND,
        }
    }
}

/// Central authority for remote-service records.
///
/// Cheaply cloneable via `Arc`; all clones share the same table.
#[derive(Clone)]
pub struct ServiceBroker {
    inner: Arc<BrokerInner>,
}

pub(crate) struct BrokerInner {
    resolver: Arc<dyn PackageResolver>,
    launcher: Arc<dyn ProcessLauncher>,
    options: BrokerOptions,
    records: Mutex<HashMap<ServiceKey, ServiceRecord>>,
}

impl ServiceBroker {
    /// Create a broker over the given collaborators.
    pub fn new(resolver: Arc<dyn PackageResolver>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self::with_options(resolver, launcher, BrokerOptions::default())
    }

    pub fn with_options(
        resolver: Arc<dyn PackageResolver>,
        launcher: Arc<dyn ProcessLauncher>,
        options: BrokerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                resolver,
                launcher,
                options,
                records: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Request-or-attach a named service instance.
    ///
    /// Registers `subscriber` on the slot's record (idempotently). When the
    /// record already holds a live handle, only `subscriber` hears an
    /// immediate `Connected`; otherwise a spawn is scheduled unless one is
    /// already in flight. Never blocks on process creation.
    ///
    /// # Errors
    ///
    /// `PackageNotFound` / `IdentityMismatch` when the caller does not own
    /// the package named in `options`.
    pub async fn request_service(
        &self,
        caller: Caller,
        options: &ServiceOptions,
        subscriber: Subscriber,
    ) -> SvcliteResult<RequestStatus> {
        let package_info = self.ensure_calling_package(&options.component.package, caller)?;
        let key = options.service_key();

        // Decide and record intent inside the lock; spawn outside it.
        let (status, launch, stale_handle) = {
            let mut records = self.inner.lock_records()?;
            let stale_handle =
                self.inner
                    .reap_stale_locked(&mut records, &key, options.version_code);

            match records.get_mut(&key) {
                Some(record) => {
                    record.subscribers.register(subscriber.clone());

                    if let Some(handle) = record.live_handle() {
                        tracing::info!(key = %key, token = %record.token, "found existing service record");
                        // Everyone else already heard Connected at attach
                        // time; only the joining subscriber is told now.
                        let event = ConnectionEvent::Connected {
                            component: record.component.clone(),
                            handle,
                        };
                        if subscriber.deliver(event).is_err() {
                            tracing::warn!(
                                key = %key,
                                subscriber = %subscriber.id(),
                                "subscriber vanished before connected delivery"
                            );
                        }
                        (RequestStatus::Reused, None, stale_handle)
                    } else if record.spawn_in_flight {
                        tracing::debug!(key = %key, token = %record.token, "spawn in flight; joining record");
                        (RequestStatus::Reused, None, stale_handle)
                    } else {
                        // A previous spawn failed; retry is demand-driven.
                        record.spawn_in_flight = true;
                        let command = record.launch_command(options, caller.uid);
                        (
                            RequestStatus::SpawnScheduled,
                            Some((record.token.clone(), command)),
                            stale_handle,
                        )
                    }
                }
                None => {
                    let token = AttachToken::mint();
                    let removal = RemovalHandle::new(
                        key.clone(),
                        token.clone(),
                        Arc::downgrade(&self.inner),
                    );
                    let mut record = ServiceRecord::new(
                        key.clone(),
                        token.clone(),
                        options,
                        package_info.source_dir.clone(),
                        removal,
                    );
                    record.subscribers.register(subscriber.clone());
                    record.spawn_in_flight = true;
                    let command = record.launch_command(options, caller.uid);

                    tracing::info!(
                        key = %key,
                        token = %record.token,
                        version = record.version,
                        apk = %record.source_dir.display(),
                        "new service record"
                    );
                    self.inner.notify_created(&record);
                    records.insert(key.clone(), record);

                    (
                        RequestStatus::SpawnScheduled,
                        Some((token, command)),
                        stale_handle,
                    )
                }
            }
        };

        if let Some(handle) = stale_handle {
            tokio::spawn(async move { handle.shutdown().await });
        }

        if let Some((token, command)) = launch {
            let inner = Arc::clone(&self.inner);
            let key = key.clone();
            tokio::spawn(async move { run_spawn(inner, key, token, command).await });
        }

        Ok(status)
    }

    /// Remove the record addressed by `options`, notifying its subscribers.
    ///
    /// # Errors
    ///
    /// Same identity validation as [`Self::request_service`]. A missing
    /// record is not an error: it reports [`RemoveStatus::NotFound`] with
    /// no side effects.
    pub async fn remove_service(
        &self,
        caller: Caller,
        options: &ServiceOptions,
    ) -> SvcliteResult<RemoveStatus> {
        self.ensure_calling_package(&options.component.package, caller)?;
        let key = options.service_key();

        let handle = {
            let mut records = self.inner.lock_records()?;
            if !records.contains_key(&key) {
                return Ok(RemoveStatus::NotFound);
            }
            tracing::debug!(key = %key, "removing service record on request");
            self.inner.teardown_locked(&mut records, &key)
        };

        if let Some(handle) = handle {
            tokio::spawn(async move { handle.shutdown().await });
        }

        Ok(RemoveStatus::Removed)
    }

    /// Attach handshake: bind a spawned process's handle into the record
    /// holding its token, then tell every subscriber.
    ///
    /// # Errors
    ///
    /// `UnknownToken` when no record is waiting for `token`;
    /// `AlreadyAttached` when the record already holds a handle. Neither
    /// mutates any record.
    pub async fn attach(&self, handle: Arc<dyn RemoteHandle>, token: &str) -> SvcliteResult<()> {
        let removal = {
            let mut records = self.inner.lock_records()?;
            // Linear scan: the table is bounded by distinct service keys.
            let record = records
                .values_mut()
                .find(|r| r.token.matches(token))
                .ok_or_else(|| SvcliteError::UnknownToken(token.to_string()))?;

            if record.is_attached() {
                return Err(SvcliteError::AlreadyAttached(record.key.to_string()));
            }

            tracing::debug!(key = %record.key, "received handle for service record");
            record.handle = Some(Arc::clone(&handle));
            record.spawn_in_flight = false;
            record.broadcast_connected();
            record.removal.clone()
        };

        // Arm death detection outside the lock, bound to this record's
        // removal capability.
        tokio::spawn(async move {
            handle.closed().await;
            removal.invoke();
        });

        Ok(())
    }

    /// List all records, newest first.
    pub fn list_services(&self) -> SvcliteResult<Vec<ServiceInfo>> {
        let records = self.inner.lock_records()?;
        let mut infos: Vec<ServiceInfo> = records.values().map(|r| r.to_info()).collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    /// Snapshot of one record, if present.
    pub fn get_service(&self, key: &ServiceKey) -> SvcliteResult<Option<ServiceInfo>> {
        let records = self.inner.lock_records()?;
        Ok(records.get(key).map(|r| r.to_info()))
    }

    pub fn service_count(&self) -> SvcliteResult<usize> {
        Ok(self.inner.lock_records()?.len())
    }

    /// Validate that the caller actually owns `package`.
    fn ensure_calling_package(
        &self,
        package: &str,
        caller: Caller,
    ) -> SvcliteResult<PackageRecord> {
        let app_id = pkg::app_id(caller.uid);
        let user_id = pkg::user_id(caller.uid);

        let info = self
            .inner
            .resolver
            .package_info(package, pkg::MATCH_UNINSTALLED_PACKAGES, user_id)
            .ok_or_else(|| SvcliteError::PackageNotFound {
                package: package.to_string(),
                user_id,
            })?;

        if pkg::app_id(info.uid) != app_id {
            return Err(SvcliteError::IdentityMismatch {
                package: package.to_string(),
                app_id,
            });
        }

        Ok(info)
    }
}

/// Launch the starter for one record and reconcile the outcome.
///
/// Runs on a worker task, never under the table lock. A clean exit leaves
/// the record waiting for attach; a failure clears the in-flight flag so a
/// later request can retry.
async fn run_spawn(
    inner: Arc<BrokerInner>,
    key: ServiceKey,
    token: AttachToken,
    command: LaunchCommand,
) {
    tracing::debug!(key = %key, token = %token, "starting process for service record");

    match inner.launcher.launch(&command).await {
        Ok(0) => {
            tracing::debug!(key = %key, "starter exited cleanly; waiting for attach");
        }
        Ok(code) => {
            tracing::warn!(key = %key, code, "starter exited with non-zero status");
            inner.spawn_failed(&key, &token);
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to launch service process");
            inner.spawn_failed(&key, &token);
        }
    }
}

impl BrokerInner {
    fn lock_records(
        &self,
    ) -> SvcliteResult<MutexGuard<'_, HashMap<ServiceKey, ServiceRecord>>> {
        self.records
            .lock()
            .map_err(|e| SvcliteError::Internal(format!("record table lock poisoned: {}", e)))
    }

    /// Stale-record policy: version mismatch is checked before liveness,
    /// and governs when both differ. Returns the removed record's handle,
    /// if any, for post-lock shutdown.
    fn reap_stale_locked(
        &self,
        records: &mut HashMap<ServiceKey, ServiceRecord>,
        key: &ServiceKey,
        version_code: u32,
    ) -> Option<Arc<dyn RemoteHandle>> {
        let record = records.get(key)?;

        if record.version != version_code {
            tracing::debug!(
                key = %key,
                token = %record.token,
                old = record.version,
                new = version_code,
                "removing service record: version code mismatch"
            );
        } else if record.handle.as_ref().is_some_and(|h| !h.is_alive()) {
            tracing::debug!(key = %key, token = %record.token, "service in record is dead");
        } else {
            return None;
        }

        self.teardown_locked(records, key)
    }

    /// Remove a record from the table: broadcast `Disconnected`, clear its
    /// subscribers, run the removal hook. Returns the stored handle for
    /// post-lock shutdown.
    fn teardown_locked(
        &self,
        records: &mut HashMap<ServiceKey, ServiceRecord>,
        key: &ServiceKey,
    ) -> Option<Arc<dyn RemoteHandle>> {
        let mut record = records.remove(key)?;
        record.broadcast_disconnected();
        record.subscribers.clear();
        self.notify_removed(&record);
        record.handle.take()
    }

    /// Remove the record at `key` only if it still carries `token`.
    /// Invoked by the death watch; a successor record is left alone.
    pub(crate) fn remove_if_current(&self, key: &ServiceKey, token: &AttachToken) {
        let Ok(mut records) = self.lock_records() else {
            return;
        };

        if records.get(key).is_some_and(|r| r.token == *token) {
            tracing::info!(key = %key, "service process died; removing record");
            let _ = self.teardown_locked(&mut records, key);
        }
    }

    /// Clear the in-flight flag after a failed spawn, so the next request
    /// for the key schedules a new one. Ignored if the record was replaced
    /// or managed to attach in the meantime.
    fn spawn_failed(&self, key: &ServiceKey, token: &AttachToken) {
        let Ok(mut records) = self.lock_records() else {
            return;
        };

        if let Some(record) = records.get_mut(key)
            && record.token == *token
            && !record.is_attached()
        {
            record.spawn_in_flight = false;
        }
    }

    fn notify_created(&self, record: &ServiceRecord) {
        if let Some(hook) = &self.options.on_record_created {
            hook(&record.to_info());
        }
    }

    fn notify_removed(&self, record: &ServiceRecord) {
        if let Some(hook) = &self.options.on_record_removed {
            hook(&record.to_info());
        }
    }
}

impl std::fmt::Debug for ServiceBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBroker")
            .field("records", &self.service_count().unwrap_or(0))
            .finish()
    }
}

// Compile-time assertions to ensure ServiceBroker is Send + Sync
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<ServiceBroker>;
};
