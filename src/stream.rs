// ABOUTME: Activity stream aggregator composing per-user and social views over stored sits
// ABOUTME: Also builds the sparse year/month timeline that drives the navigation sidebar

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{sit, user};
use crate::error::{AppError, Result};
use crate::storage::{Period, SitOrder, Storage};
use crate::types::{Entry, TimelineBucket};

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn from_timestamp(secs: i64) -> Result<Self> {
        DateTime::from_timestamp(secs, 0)
            .map(Self::of)
            .ok_or_else(|| AppError::Internal(format!("timestamp {} out of range", secs)))
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

fn month_start(year: i32, month: u32) -> Result<i64> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|start| start.timestamp())
        .ok_or_else(|| AppError::InvalidArgument(format!("Invalid period {}-{:02}", year, month)))
}

pub fn year_period(year: i32) -> Result<Period> {
    Ok(Period {
        from: month_start(year, 1)?,
        until: month_start(year + 1, 1)?,
    })
}

pub fn month_period(month: u32, year: i32) -> Result<Period> {
    if !(1..=12).contains(&month) {
        return Err(AppError::InvalidArgument(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }
    let this = YearMonth { year, month };
    let next = this.next();
    Ok(Period {
        from: month_start(this.year, this.month)?,
        until: month_start(next.year, next.month)?,
    })
}

/// Every month from `latest` back to `earliest` inclusive, newest first.
/// When `earliest` lies after `latest` only `earliest` is returned.
pub fn months_back(latest: YearMonth, earliest: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = latest.max(earliest);
    loop {
        months.push(current);
        if current <= earliest {
            break;
        }
        current = current.previous();
    }
    months
}

#[derive(Clone)]
pub struct ActivityStream {
    storage: Arc<Storage>,
}

impl ActivityStream {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// The user's own sits, newest first, at most `n`.
    pub async fn latest_entries(&self, user_id: Uuid, n: u64) -> Result<Vec<Entry>> {
        let sits = self
            .storage
            .entries_of(user_id, None, SitOrder::NewestFirst, Some(n), true)
            .await?;
        Entry::from_models(sits)
    }

    /// The user's sits as `viewer` may see them: everything for the author,
    /// public sits only for anyone else.
    pub async fn latest_entries_seen_by(
        &self,
        user_id: Uuid,
        n: u64,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Entry>> {
        let include_private = viewer == Some(user_id);
        let sits = self
            .storage
            .entries_of(user_id, None, SitOrder::NewestFirst, Some(n), include_private)
            .await?;
        Entry::from_models(sits)
    }

    /// Sits by everyone `user_id` follows, newest first.
    pub async fn social_stream(&self, user_id: Uuid) -> Result<Vec<Entry>> {
        let followed = self.storage.followed_ids(user_id).await?;
        let sits = self.storage.entries_by_authors(&followed, None).await?;
        Entry::from_models(sits)
    }

    /// One page of the social stream; pages are numbered from 1.
    pub async fn social_stream_page(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<Entry>> {
        let followed = self.storage.followed_ids(user_id).await?;
        let sits = self
            .storage
            .entries_by_authors(&followed, Some((page.max(1) - 1, per_page.max(1))))
            .await?;
        Entry::from_models(sits)
    }

    pub async fn entries_in_year(&self, user_id: Uuid, year: i32) -> Result<u64> {
        self.storage
            .count_entries(user_id, year_period(year)?)
            .await
    }

    pub async fn entries_in_month(&self, user_id: Uuid, month: u32, year: i32) -> Result<u64> {
        self.storage
            .count_entries(user_id, month_period(month, year)?)
            .await
    }

    async fn first_entry_month(&self, user_id: Uuid) -> Result<Option<YearMonth>> {
        let first = self
            .storage
            .entries_of(user_id, None, SitOrder::OldestFirst, Some(1), true)
            .await?;
        first
            .first()
            .map(|sit| YearMonth::from_timestamp(sit.created_at))
            .transpose()
    }

    /// Walks back from the month of `now` to the month of the user's first sit.
    ///
    /// A year bucket is emitted whenever the walk enters a new year, even when that
    /// year's total is zero; month buckets appear only for months with activity.
    pub async fn timeline(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<TimelineBucket>> {
        let Some(first) = self.first_entry_month(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut buckets = Vec::new();
        let mut current_year = None;

        for YearMonth { year, month } in months_back(YearMonth::of(now), first) {
            if current_year != Some(year) {
                let count = self.entries_in_year(user_id, year).await?;
                buckets.push(TimelineBucket::Year { year, count });
                current_year = Some(year);
            }

            let count = self.entries_in_month(user_id, month, year).await?;
            if count != 0 {
                buckets.push(TimelineBucket::Month { year, month, count });
            }
        }

        Ok(buckets)
    }

    pub async fn last_update(&self, user_id: Uuid) -> Result<Option<i64>> {
        let newest = self
            .storage
            .entries_of(user_id, None, SitOrder::NewestFirst, Some(1), true)
            .await?;
        Ok(newest.first().map(|sit| sit.created_at))
    }

    /// The author's neighbouring sits around `sit` as `viewer` may see them.
    pub async fn adjacent_entries(
        &self,
        sit: &sit::Model,
        viewer: Option<Uuid>,
    ) -> Result<(Option<Entry>, Option<Entry>)> {
        let include_private = viewer == Some(sit.user_id);
        let previous = self.storage.previous_entry(sit, include_private).await?;
        let next = self.storage.next_entry(sit, include_private).await?;
        Ok((
            previous.map(Entry::try_from).transpose()?,
            next.map(Entry::try_from).transpose()?,
        ))
    }

    /// Resets a running streak when nothing was logged on the previous UTC day.
    /// Returns whether the streak was broken.
    pub async fn break_streak(&self, user: &user::Model, now: DateTime<Utc>) -> Result<bool> {
        if user.streak == 0 {
            return Ok(false);
        }

        let today = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .ok_or_else(|| AppError::Internal(format!("no midnight for {}", now)))?;
        let yesterday = Period {
            from: (today - Duration::days(1)).timestamp(),
            until: today.timestamp(),
        };

        if self.storage.count_entries(user.id, yesterday).await? > 0 {
            return Ok(false);
        }

        self.storage.set_streak(user.id, 0).await?;
        tracing::debug!(username = %user.username, "streak broken");
        Ok(true)
    }
}
