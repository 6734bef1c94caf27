//! Outbound mutation queue.
//!
//! DESIGN
//! ======
//! The store pushes mutations onto an unbounded channel and returns at once,
//! so input handlers never block on the network. [`forward_mutations`] drains
//! the channel in order and submits each entry to the sync service.
//!
//! When the forwarder falls behind (a burst of drag moves queued while a
//! previous write is in flight), consecutive updates to the same note are
//! merged into one patch before submission. The merged patch carries every
//! field and the latest `updated_at`, so the state the service ends up with
//! is the same as sending each patch individually.
//!
//! UNCONFIRMED WRITES
//! ==================
//! Every queued mutation is also recorded in a ledger shared by all clones of
//! the [`Outbox`]. A snapshot pushed by the service may predate writes this
//! client has already applied locally, so [`Outbox::rebase`] replays the
//! ledger over each incoming snapshot. An entry leaves the ledger when the
//! service rejects it, or once it has been acknowledged and a snapshot
//! reflects it.
//!
//! ERROR HANDLING
//! ==============
//! Nothing is retried here. A failure is logged and handed to every
//! [`Receipt`] attached to the entry; fire-and-forget entries have none.

#[cfg(test)]
#[path = "outbox_test.rs"]
mod outbox_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::StreamExt;
use futures::channel::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::doc::{Note, NoteId};
use crate::error::{ErrorCode, SyncError};
use crate::sync::{Mutation, SyncService};

type Ack = oneshot::Sender<Result<(), SyncError>>;

/// One queued mutation and the receipts waiting on it.
#[derive(Debug)]
pub struct Pending {
    pub mutation: Mutation,
    acks: Vec<Ack>,
    /// Ledger entries this submission settles; several after coalescing.
    seqs: Vec<u64>,
    writes: Weak<RefCell<PendingWrites>>,
}

impl Pending {
    /// An entry with no receipts and no ledger record.
    #[must_use]
    pub fn new(mutation: Mutation) -> Self {
        Self { mutation, acks: Vec::new(), seqs: Vec::new(), writes: Weak::new() }
    }

    /// Record the service's answer in the ledger and on every receipt.
    pub fn settle(self, result: &Result<(), SyncError>) {
        let id = self.mutation.note_id();
        if let Some(writes) = self.writes.upgrade() {
            writes.borrow_mut().settle(&self.seqs, result.is_ok());
        }
        for ack in self.acks {
            if ack.send(result.clone()).is_err() {
                debug!(%id, "receipt dropped before the result arrived");
            }
        }
    }
}

/// Receiving end of the outbox, consumed by [`forward_mutations`].
pub type OutboxReceiver = mpsc::UnboundedReceiver<Pending>;

/// Sending end of the outbox, owned by the store.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Pending>,
    writes: Rc<RefCell<PendingWrites>>,
}

/// Create a connected outbox pair.
#[must_use]
pub fn channel() -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::unbounded();
    (Outbox { tx, writes: Rc::default() }, rx)
}

impl Outbox {
    /// Queue a mutation without waiting for its outcome.
    pub fn send(&self, mutation: Mutation) {
        self.push(mutation, Vec::new());
    }

    /// Queue a mutation and get a receipt for its outcome.
    #[must_use]
    pub fn send_confirmed(&self, mutation: Mutation) -> Receipt {
        let (ack, rx) = oneshot::channel();
        self.push(mutation, vec![ack]);
        Receipt { rx }
    }

    /// Local writes not yet retired from the ledger.
    #[must_use]
    pub fn unconfirmed(&self) -> usize {
        self.writes.borrow().entries.len()
    }

    /// Replay unconfirmed local writes over a freshly loaded note map.
    ///
    /// Acknowledged entries the map already reflects are retired first; the
    /// rest are applied in the order they were queued. Returns how many
    /// entries were replayed.
    pub fn rebase(&self, notes: &mut HashMap<NoteId, Note>) -> usize {
        let mut writes = self.writes.borrow_mut();
        writes.entries.retain(|entry| !(entry.acked && reflected(&entry.mutation, notes)));
        for entry in &writes.entries {
            replay(&entry.mutation, notes);
        }
        writes.entries.len()
    }

    fn push(&self, mutation: Mutation, acks: Vec<Ack>) {
        let seq = self.writes.borrow_mut().record(mutation.clone());
        let pending = Pending { mutation, acks, seqs: vec![seq], writes: Rc::downgrade(&self.writes) };
        if let Err(err) = self.tx.unbounded_send(pending) {
            // Receipts on the dropped entry resolve to `Closed`.
            let pending = err.into_inner();
            self.writes.borrow_mut().settle(&pending.seqs, false);
            warn!(id = %pending.mutation.note_id(), "outbox closed; mutation dropped");
        }
    }
}

/// Local writes awaiting confirmation, in queue order.
#[derive(Debug, Default)]
struct PendingWrites {
    next_seq: u64,
    entries: Vec<PendingWrite>,
}

#[derive(Debug)]
struct PendingWrite {
    seq: u64,
    mutation: Mutation,
    acked: bool,
}

impl PendingWrites {
    fn record(&mut self, mutation: Mutation) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(PendingWrite { seq, mutation, acked: false });
        seq
    }

    /// Mark entries acknowledged, or forget them if the service refused.
    fn settle(&mut self, seqs: &[u64], ok: bool) {
        if ok {
            for entry in self.entries.iter_mut().filter(|e| seqs.contains(&e.seq)) {
                entry.acked = true;
            }
        } else {
            self.entries.retain(|e| !seqs.contains(&e.seq));
        }
    }
}

/// Whether `notes` already shows the effect of `mutation`.
fn reflected(mutation: &Mutation, notes: &HashMap<NoteId, Note>) -> bool {
    match mutation {
        Mutation::CreateNote(note) => notes.contains_key(&note.id),
        Mutation::UpdateNote { id, patch } => {
            notes.get(id).is_none_or(|note| patch.updated_at.is_none_or(|ts| note.updated_at >= ts))
        }
        Mutation::DeleteNote { id } => !notes.contains_key(id),
    }
}

/// Apply a local write on top of `notes` with the same last-write-wins rule the service uses.
fn replay(mutation: &Mutation, notes: &mut HashMap<NoteId, Note>) {
    match mutation {
        Mutation::CreateNote(note) => {
            notes.entry(note.id).or_insert_with(|| note.clone());
        }
        Mutation::UpdateNote { id, patch } => {
            if let Some(note) = notes.get_mut(id) {
                if patch.updated_at.is_none_or(|ts| ts >= note.updated_at) {
                    patch.apply_to(note);
                }
            }
        }
        Mutation::DeleteNote { id } => {
            notes.remove(id);
        }
    }
}

/// Resolves to the service's answer for one queued mutation.
#[derive(Debug)]
pub struct Receipt {
    rx: oneshot::Receiver<Result<(), SyncError>>,
}

impl Future for Receipt {
    type Output = Result<(), SyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SyncError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Merge runs of updates to the same note into one entry each.
#[must_use]
pub fn coalesce(batch: Vec<Pending>) -> Vec<Pending> {
    let mut out: Vec<Pending> = Vec::with_capacity(batch.len());
    for entry in batch {
        if let Some(last) = out.last_mut() {
            if let (
                Mutation::UpdateNote { id: last_id, patch: last_patch },
                Mutation::UpdateNote { id, patch },
            ) = (&mut last.mutation, &entry.mutation)
            {
                if *last_id == *id {
                    last_patch.merge(patch.clone());
                    last.acks.extend(entry.acks);
                    last.seqs.extend(entry.seqs);
                    continue;
                }
            }
        }
        out.push(entry);
    }
    out
}

/// Drain the outbox into `service` until every sender is gone.
pub async fn forward_mutations(service: Rc<dyn SyncService>, mut rx: OutboxReceiver, coalesce_updates: bool) {
    while let Some(first) = rx.next().await {
        let mut batch = vec![first];
        while let Ok(Some(next)) = rx.try_next() {
            batch.push(next);
        }
        let queued = batch.len();
        let batch = if coalesce_updates { coalesce(batch) } else { batch };
        if batch.len() < queued {
            debug!(queued, sent = batch.len(), "coalesced queued note updates");
        }
        for entry in batch {
            deliver(service.as_ref(), entry).await;
        }
    }
    debug!("outbox closed; forwarder exiting");
}

async fn deliver(service: &dyn SyncService, entry: Pending) {
    let id = entry.mutation.note_id();
    let result = service.transact(vec![entry.mutation.clone()]).await;
    if let Err(err) = &result {
        warn!(%id, code = err.error_code(), error = %err, "mutation failed");
    }
    entry.settle(&result);
}
