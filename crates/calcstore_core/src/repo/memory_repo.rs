//! In-memory calculation repository.
//!
//! Mirrors the SQLite repository semantics (tombstoned ids, creation order,
//! owner filter, pagination) without durability. Used as a test double and
//! for throwaway sessions.

use crate::model::calculation::{Calculation, CalculationId};
use crate::repo::calculation_repo::{
    CalculationListQuery, CalculationRepository, RepoError, RepoResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct InMemoryCalculationRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_seq: u64,
    live: HashMap<CalculationId, (u64, Calculation)>,
    retired: HashSet<CalculationId>,
}

impl InMemoryCalculationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.read()?.live.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.read()?.live.is_empty())
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| RepoError::LockPoisoned)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| RepoError::LockPoisoned)
    }
}

impl CalculationRepository for InMemoryCalculationRepository {
    fn create_calculation(&self, calculation: &Calculation) -> RepoResult<CalculationId> {
        calculation.validate()?;

        let mut state = self.write()?;
        if state.live.contains_key(&calculation.id) || state.retired.contains(&calculation.id) {
            return Err(RepoError::Conflict(calculation.id));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .live
            .insert(calculation.id, (seq, calculation.clone()));
        Ok(calculation.id)
    }

    fn list_calculations(&self, query: &CalculationListQuery) -> RepoResult<Vec<Calculation>> {
        let state = self.read()?;
        let mut entries: Vec<&(u64, Calculation)> = state
            .live
            .values()
            .filter(|(_, calculation)| match &query.owner_id {
                Some(owner_id) => calculation.is_owned_by(owner_id),
                None => true,
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);

        let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(entries
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .map(|(_, calculation)| calculation.clone())
            .collect())
    }

    fn get_calculation(&self, id: CalculationId) -> RepoResult<Calculation> {
        self.read()?
            .live
            .get(&id)
            .map(|(_, calculation)| calculation.clone())
            .ok_or(RepoError::NotFound(id))
    }

    fn update_calculation(&self, calculation: &Calculation) -> RepoResult<()> {
        calculation.validate()?;

        let mut state = self.write()?;
        match state.live.get_mut(&calculation.id) {
            Some((_, stored)) => {
                *stored = calculation.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound(calculation.id)),
        }
    }

    fn delete_calculation(&self, id: CalculationId) -> RepoResult<()> {
        let mut state = self.write()?;
        if state.live.remove(&id).is_none() {
            return Err(RepoError::NotFound(id));
        }
        state.retired.insert(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryCalculationRepository;
    use crate::model::calculation::Calculation;
    use crate::repo::calculation_repo::{CalculationListQuery, CalculationRepository, RepoError};
    use uuid::Uuid;

    fn calc(expression: &str, result: &str, owner: Option<&str>) -> Calculation {
        Calculation::with_id(
            Uuid::new_v4(),
            expression,
            result,
            owner.map(str::to_string),
        )
    }

    #[test]
    fn deleted_ids_cannot_be_recreated() {
        let repo = InMemoryCalculationRepository::new();
        let record = calc("1+1", "2", None);
        repo.create_calculation(&record).unwrap();
        repo.delete_calculation(record.id).unwrap();

        let err = repo.create_calculation(&record).unwrap_err();
        assert!(matches!(err, RepoError::Conflict(id) if id == record.id));
        assert!(repo.is_empty().unwrap());
    }

    #[test]
    fn list_keeps_creation_order_and_paginates() {
        let repo = InMemoryCalculationRepository::new();
        let records: Vec<Calculation> = (0..4)
            .map(|n| calc(&format!("{n}+0"), &n.to_string(), None))
            .collect();
        for record in &records {
            repo.create_calculation(record).unwrap();
        }

        let page = repo
            .list_calculations(&CalculationListQuery {
                limit: Some(2),
                offset: 1,
                ..CalculationListQuery::default()
            })
            .unwrap();
        assert_eq!(page, records[1..3].to_vec());
    }

    #[test]
    fn list_filters_by_owner() {
        let repo = InMemoryCalculationRepository::new();
        let mine = calc("2*2", "4", Some("alice"));
        repo.create_calculation(&mine).unwrap();
        repo.create_calculation(&calc("3*3", "9", Some("bob")))
            .unwrap();
        repo.create_calculation(&calc("4*4", "16", None)).unwrap();

        let owned = repo
            .list_calculations(&CalculationListQuery::for_owner("alice"))
            .unwrap();
        assert_eq!(owned, vec![mine]);
        assert_eq!(repo.len().unwrap(), 3);
    }

    #[test]
    fn invalid_records_are_rejected_before_storage() {
        let repo = InMemoryCalculationRepository::new();
        let err = repo.create_calculation(&calc("1+1", "", None)).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert!(repo.is_empty().unwrap());
    }
}
