//! Per-team, per-point ordered action log held in the cache.
//!
//! The buffer is the single source of truth while a point is in progress.
//! Per-team indices are contiguous from 1 to the team counter; two shared keys
//! per point record the pulling and receiving team. All key construction lives
//! in [`BufferKey`] so the format never leaks to callers.

use std::sync::Arc;

use uuid::Uuid;

use super::{CacheError, CacheResult, LiveCache};
use crate::dao::models::LiveAction;
use crate::state::point::TeamSide;

/// Typed builder for the cache keys of one point's buffer.
#[derive(Debug, Clone, Copy)]
struct BufferKey {
    game_id: Uuid,
    point_id: Uuid,
}

impl BufferKey {
    fn action(&self, side: TeamSide, index: u32) -> String {
        format!("live:{}:{}:{}:{}", self.game_id, self.point_id, side, index)
    }

    fn counter(&self, side: TeamSide) -> String {
        format!("live:{}:{}:{}:count", self.game_id, self.point_id, side)
    }

    fn pulling(&self) -> String {
        format!("live:{}:{}:pulling", self.game_id, self.point_id)
    }

    fn receiving(&self) -> String {
        format!("live:{}:{}:receiving", self.game_id, self.point_id)
    }
}

/// Handle on the live buffer of one `(game, point)` pair.
#[derive(Clone)]
pub struct LiveActionBuffer {
    cache: Arc<dyn LiveCache>,
    key: BufferKey,
}

impl LiveActionBuffer {
    /// Address the buffer of a point. No cache traffic happens here.
    pub fn new(cache: Arc<dyn LiveCache>, game_id: Uuid, point_id: Uuid) -> Self {
        Self {
            cache,
            key: BufferKey { game_id, point_id },
        }
    }

    /// Reset both team counters to zero and record the pulling/receiving
    /// assignment. Re-initializing overwrites without error.
    pub async fn initialize(&self, pulling_team_id: Uuid, receiving_team_id: Uuid) -> CacheResult<()> {
        self.cache
            .set(self.key.counter(TeamSide::One), "0".into())
            .await?;
        self.cache
            .set(self.key.counter(TeamSide::Two), "0".into())
            .await?;
        self.record_assignment(pulling_team_id, receiving_team_id)
            .await
    }

    /// (Re)write the shared pulling/receiving assignment without touching
    /// either team's log.
    pub async fn record_assignment(
        &self,
        pulling_team_id: Uuid,
        receiving_team_id: Uuid,
    ) -> CacheResult<()> {
        self.cache
            .set(self.key.pulling(), pulling_team_id.to_string())
            .await?;
        self.cache
            .set(self.key.receiving(), receiving_team_id.to_string())
            .await
    }

    /// Empty one team's log and leave its counter at zero. The other team and
    /// the shared assignment are untouched.
    pub async fn reset_team(&self, side: TeamSide) -> CacheResult<()> {
        self.drain_team(side).await?;
        self.cache.set(self.key.counter(side), "0".into()).await
    }

    /// Current buffered count for a team; an absent counter means empty.
    pub async fn count_for(&self, side: TeamSide) -> CacheResult<u32> {
        let key = self.key.counter(side);
        match self.cache.get(key.clone()).await? {
            None => Ok(0),
            Some(raw) => raw.parse::<u32>().map_err(|err| CacheError::Corrupt {
                key,
                message: err.to_string(),
            }),
        }
    }

    /// Append an action for a team, returning its 1-based index.
    pub async fn push(&self, side: TeamSide, action: &LiveAction) -> CacheResult<u32> {
        let index = self.count_for(side).await? + 1;
        self.write_entry(side, index, action).await?;
        self.cache
            .set(self.key.counter(side), index.to_string())
            .await?;
        Ok(index)
    }

    /// Replay a team's buffered actions in order, from index 1 to the counter.
    ///
    /// A missing index means the buffer is corrupt and fails the read.
    pub async fn read_all(&self, side: TeamSide) -> CacheResult<Vec<LiveAction>> {
        let count = self.count_for(side).await?;
        let mut actions = Vec::with_capacity(count as usize);
        for index in 1..=count {
            actions.push(self.read_entry(side, index).await?);
        }
        Ok(actions)
    }

    /// The team's most recently buffered action, if any.
    pub async fn read_last(&self, side: TeamSide) -> CacheResult<Option<LiveAction>> {
        let count = self.count_for(side).await?;
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_entry(side, count).await?))
    }

    /// Rebuild a team's buffer from persisted actions, preserving their
    /// original 1-based numbering. Inverse of finalize.
    ///
    /// An empty persisted set means the finalizer has not migrated the log
    /// yet; the live entries are still authoritative and stay untouched.
    pub async fn restore(&self, side: TeamSide, actions: &[(u32, LiveAction)]) -> CacheResult<()> {
        if actions.is_empty() {
            return Ok(());
        }
        let mut highest = 0;
        for (number, action) in actions {
            self.write_entry(side, *number, action).await?;
            highest = highest.max(*number);
        }
        self.cache
            .set(self.key.counter(side), highest.to_string())
            .await?;
        Ok(())
    }

    /// Delete a team's action entries and counter. Idempotent.
    pub async fn drain_team(&self, side: TeamSide) -> CacheResult<()> {
        let count = self.count_for(side).await?;
        for index in 1..=count {
            self.cache.del(self.key.action(side, index)).await?;
        }
        self.cache.del(self.key.counter(side)).await?;
        Ok(())
    }

    /// Delete a team's counter without touching entries. Used as cleanup when
    /// the counterpart finalizer already emptied the buffer.
    pub async fn drop_counter(&self, side: TeamSide) -> CacheResult<()> {
        self.cache.del(self.key.counter(side)).await
    }

    /// Delete the shared pulling/receiving keys. Only correct once both teams
    /// are drained. Idempotent.
    pub async fn drain_shared(&self) -> CacheResult<()> {
        self.cache.del(self.key.pulling()).await?;
        self.cache.del(self.key.receiving()).await?;
        Ok(())
    }

    /// The recorded pulling team, if the buffer is initialized.
    pub async fn pulling_team(&self) -> CacheResult<Option<Uuid>> {
        self.read_team_tag(self.key.pulling()).await
    }

    /// The recorded receiving team, if the buffer is initialized.
    pub async fn receiving_team(&self) -> CacheResult<Option<Uuid>> {
        self.read_team_tag(self.key.receiving()).await
    }

    async fn read_team_tag(&self, key: String) -> CacheResult<Option<Uuid>> {
        match self.cache.get(key.clone()).await? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<Uuid>()
                .map(Some)
                .map_err(|err| CacheError::Corrupt {
                    key,
                    message: err.to_string(),
                }),
        }
    }

    async fn write_entry(&self, side: TeamSide, index: u32, action: &LiveAction) -> CacheResult<()> {
        let key = self.key.action(side, index);
        let payload = serde_json::to_string(action).map_err(|err| CacheError::Corrupt {
            key: key.clone(),
            message: err.to_string(),
        })?;
        self.cache.set(key, payload).await
    }

    async fn read_entry(&self, side: TeamSide, index: u32) -> CacheResult<LiveAction> {
        let key = self.key.action(side, index);
        let raw = self
            .cache
            .get(key.clone())
            .await?
            .ok_or(CacheError::MissingEntry { key: key.clone() })?;
        serde_json::from_str(&raw).map_err(|err| CacheError::Corrupt {
            key,
            message: err.to_string(),
        })
    }
}
