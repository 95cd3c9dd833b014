// Copyright 2016 Matthew Collins
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{HashMap, VecDeque};
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use log::{debug, error, trace};

use crate::protocol;
use crate::shared::{ChunkPos, Position};
use crate::types::hash::FNVHash;
use crate::world::column::{self, ColumnJob, DecodedColumn};

pub const NUM_WORKERS: usize = 4;

/// A column decode that finished on a worker, ready to be applied by the
/// owning thread.
#[derive(Debug)]
pub enum Completed {
    /// The column plus the block changes that arrived while it was decoding,
    /// in arrival order.
    Column(DecodedColumn, Vec<(Position, u16)>),
    Failed(ChunkPos, protocol::Error),
}

/// Decodes chunk columns on a pool of worker threads.
///
/// Jobs for the same column always go to the same worker so they finish in
/// submission order. Results are only handed out through `drain`.
pub struct ChunkDecoder {
    threads: Vec<(mpsc::Sender<DecodeReq>, thread::JoinHandle<()>)>,
    next_worker: usize,
    next_ticket: u64,
    decoded_recv: mpsc::Receiver<DecodeReply>,
    pending: HashMap<ChunkPos, Pending, BuildHasherDefault<FNVHash>>,
}

struct Pending {
    worker: usize,
    cancel: Arc<AtomicBool>,
    /// Outstanding tickets, oldest first, each with the block changes seen
    /// after it was submitted.
    queue: VecDeque<(u64, Vec<(Position, u16)>)>,
}

struct DecodeReq {
    ticket: u64,
    job: ColumnJob,
    cancel: Arc<AtomicBool>,
}

struct DecodeReply {
    ticket: u64,
    pos: ChunkPos,
    result: Result<Option<DecodedColumn>, protocol::Error>,
}

impl ChunkDecoder {
    pub fn new(workers: usize) -> ChunkDecoder {
        let mut threads = vec![];
        let (decoded_send, decoded_recv) = mpsc::channel();
        for id in 0..workers.max(1) {
            let decoded_send = decoded_send.clone();
            let (work_send, work_recv) = mpsc::channel();
            let handle = thread::Builder::new()
                .name(format!("chunk-decoder-{}", id))
                .spawn(move || decode_func(id, work_recv, decoded_send));
            match handle {
                Ok(handle) => threads.push((work_send, handle)),
                Err(err) => error!("Failed to start decode worker {}: {}", id, err),
            }
        }
        ChunkDecoder {
            threads,
            next_worker: 0,
            next_ticket: 0,
            decoded_recv,
            pending: Default::default(),
        }
    }

    pub fn workers(&self) -> usize {
        self.threads.len()
    }

    pub fn submit(&mut self, job: ColumnJob) -> Result<(), protocol::Error> {
        if self.threads.is_empty() {
            return Err(protocol::Error::Err("no decode workers running".to_owned()));
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let pos = job.pos;
        let next_worker = &mut self.next_worker;
        let worker_count = self.threads.len();
        let pending = self.pending.entry(pos).or_insert_with(|| {
            let worker = *next_worker;
            *next_worker = (*next_worker + 1) % worker_count;
            Pending {
                worker,
                cancel: Arc::new(AtomicBool::new(false)),
                queue: VecDeque::new(),
            }
        });
        pending.queue.push_back((ticket, vec![]));
        trace!("Queued column {:?} as ticket {} on worker {}", pos, ticket, pending.worker);

        let req = DecodeReq {
            ticket,
            job,
            cancel: pending.cancel.clone(),
        };
        if self.threads[pending.worker].0.send(req).is_err() {
            self.pending.remove(&pos);
            return Err(protocol::Error::Err(format!("decode worker for {:?} has stopped", pos)));
        }
        Ok(())
    }

    /// Drops every outstanding decode of the column, including block changes
    /// held for it.
    pub fn cancel(&mut self, pos: ChunkPos) {
        if let Some(pending) = self.pending.remove(&pos) {
            pending.cancel.store(true, Ordering::Relaxed);
            debug!("Cancelled {} decode(s) of {:?}", pending.queue.len(), pos);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.cancel.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_pending(&self, pos: ChunkPos) -> bool {
        self.pending.contains_key(&pos)
    }

    pub fn pending_columns(&self) -> usize {
        self.pending.len()
    }

    /// Holds a block change back until the column it falls in has been
    /// committed. Returns `false` when no decode is pending for it.
    pub fn defer_block(&mut self, pos: Position, block: u16) -> bool {
        match self
            .pending
            .get_mut(&pos.column())
            .and_then(|pending| pending.queue.back_mut())
        {
            Some((_, deferred)) => {
                deferred.push((pos, block));
                true
            }
            None => false,
        }
    }

    /// Collects every finished decode without blocking.
    pub fn drain(&mut self) -> Vec<Completed> {
        let mut out = vec![];
        while let Ok(reply) = self.decoded_recv.try_recv() {
            if let Some(done) = self.complete(reply) {
                out.push(done);
            }
        }
        out
    }

    fn complete(&mut self, reply: DecodeReply) -> Option<Completed> {
        let pending = self.pending.get_mut(&reply.pos)?;
        match pending.queue.front() {
            Some((ticket, _)) if *ticket == reply.ticket => {}
            _ => {
                trace!("Dropping stale decode {} of {:?}", reply.ticket, reply.pos);
                return None;
            }
        }
        let (_, deferred) = pending.queue.pop_front()?;
        if pending.queue.is_empty() {
            self.pending.remove(&reply.pos);
        }
        match reply.result {
            Ok(Some(column)) => Some(Completed::Column(column, deferred)),
            Ok(None) => None,
            Err(err) => {
                self.cancel(reply.pos);
                Some(Completed::Failed(reply.pos, err))
            }
        }
    }
}

impl Drop for ChunkDecoder {
    fn drop(&mut self) {
        self.cancel_all();
        for (work_send, handle) in self.threads.drain(..) {
            drop(work_send);
            if handle.join().is_err() {
                error!("Decode worker panicked");
            }
        }
    }
}

fn decode_func(
    id: usize,
    work_recv: mpsc::Receiver<DecodeReq>,
    decoded_send: mpsc::Sender<DecodeReply>,
) {
    loop {
        let DecodeReq { ticket, job, cancel } = match work_recv.recv() {
            Ok(val) => val,
            Err(_) => return,
        };
        if cancel.load(Ordering::Relaxed) {
            continue;
        }
        let result = column::decode_column(&job, &cancel);
        if let Err(ref err) = result {
            error!("Worker {} failed to decode {:?}: {}", id, job.pos, err);
        }
        let reply = DecodeReply {
            ticket,
            pos: job.pos,
            result,
        };
        if decoded_send.send(reply).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::versions;
    use crate::world::section::test::encode_section;
    use crate::world::section::{SectionFormat, SECTION_VOLUME};
    use std::time::{Duration, Instant};

    fn job(x: i32, z: i32, block: i32) -> ColumnJob {
        let format = SectionFormat::for_version(versions::V1_16_2, true);
        ColumnJob {
            pos: ChunkPos::new(x, z),
            version: versions::V1_16_2,
            full: true,
            mask: Some(vec![1]),
            section_count: Some(16),
            has_skylight: true,
            data: encode_section(format, 4, &[block], &vec![0; SECTION_VOLUME]),
        }
    }

    fn wait_for(decoder: &mut ChunkDecoder, count: usize) -> Vec<Completed> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = vec![];
        while out.len() < count && Instant::now() < deadline {
            out.extend(decoder.drain());
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    fn block_of(done: &Completed) -> u16 {
        match done {
            Completed::Column(column, _) => column.sections[0].1.get(0, 0, 0),
            Completed::Failed(pos, err) => panic!("{:?} failed: {}", pos, err),
        }
    }

    #[test]
    fn columns_complete_in_submission_order() {
        let mut decoder = ChunkDecoder::new(2);
        decoder.submit(job(0, 0, 1)).unwrap();
        decoder.submit(job(0, 0, 2)).unwrap();
        decoder.submit(job(5, 5, 3)).unwrap();
        let done = wait_for(&mut decoder, 3);
        assert_eq!(done.len(), 3);
        let same_column: Vec<u16> = done
            .iter()
            .filter(|d| matches!(d, Completed::Column(c, _) if c.pos == ChunkPos::new(0, 0)))
            .map(block_of)
            .collect();
        assert_eq!(same_column, vec![1, 2]);
        assert_eq!(decoder.pending_columns(), 0);
    }

    #[test]
    fn deferred_blocks_follow_their_column() {
        let mut decoder = ChunkDecoder::new(1);
        assert!(!decoder.defer_block(Position::new(1, 1, 1), 9));
        decoder.submit(job(0, 0, 1)).unwrap();
        assert!(decoder.is_pending(ChunkPos::new(0, 0)));
        assert!(decoder.defer_block(Position::new(1, 1, 1), 9));
        let done = wait_for(&mut decoder, 1);
        match &done[0] {
            Completed::Column(_, deferred) => {
                assert_eq!(deferred, &vec![(Position::new(1, 1, 1), 9)])
            }
            Completed::Failed(_, err) => panic!("{}", err),
        }
    }

    #[test]
    fn cancelled_columns_are_never_reported() {
        let mut decoder = ChunkDecoder::new(1);
        decoder.submit(job(0, 0, 1)).unwrap();
        decoder.cancel(ChunkPos::new(0, 0));
        decoder.submit(job(1, 0, 2)).unwrap();
        let done = wait_for(&mut decoder, 1);
        thread::sleep(Duration::from_millis(50));
        let mut done = done;
        done.extend(decoder.drain());
        assert_eq!(done.len(), 1);
        assert_eq!(block_of(&done[0]), 2);
    }

    #[test]
    fn failures_are_reported_with_their_column() {
        let mut decoder = ChunkDecoder::new(1);
        let mut bad = job(3, 4, 1);
        bad.data.truncate(10);
        decoder.submit(bad).unwrap();
        let done = wait_for(&mut decoder, 1);
        match &done[0] {
            Completed::Failed(pos, _) => assert_eq!(*pos, ChunkPos::new(3, 4)),
            Completed::Column(..) => panic!("truncated column decoded"),
        }
        assert!(!decoder.is_pending(ChunkPos::new(3, 4)));
    }
}
