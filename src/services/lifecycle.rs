use anyhow::Context;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Job, JobStatus, Role, User};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    Admin,
    Member(&'a User),
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("job not found")]
    NotFound,

    #[error("cannot move a job from {from} to {to}")]
    Invalid { from: JobStatus, to: JobStatus },

    #[error("{0}")]
    NotPermitted(&'static str),

    #[error("your washer account has not been verified yet")]
    WasherNotVerified,

    #[error("job was modified by someone else, reload and try again")]
    Conflict,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Decides the washer assignment after a permitted transition, or rejects it.
fn authorize(job: &Job, actor: Actor, next: JobStatus) -> Result<Option<String>, TransitionError> {
    let from = job.status;

    // Requested -> Assigned is always a washer claiming the job for themselves.
    if from == JobStatus::Requested && next == JobStatus::Assigned {
        return match actor {
            Actor::Member(user) if user.role == Role::Washer => {
                if !user.is_verified_washer() {
                    return Err(TransitionError::WasherNotVerified);
                }
                if job.washer_id.is_some() {
                    return Err(TransitionError::Conflict);
                }
                Ok(Some(user.id.clone()))
            }
            _ => Err(TransitionError::NotPermitted(
                "jobs are assigned when a washer accepts them",
            )),
        };
    }

    let keep_or_release = if next == JobStatus::Requested {
        None
    } else {
        job.washer_id.clone()
    };

    match actor {
        Actor::Admin => Ok(keep_or_release),
        Actor::Member(user) if user.id == job.owner_id => {
            if next == JobStatus::Cancelled {
                Ok(keep_or_release)
            } else {
                Err(TransitionError::NotPermitted("owners can only cancel their jobs"))
            }
        }
        Actor::Member(user) if job.washer_id.as_deref() == Some(user.id.as_str()) => {
            match (from, next) {
                (JobStatus::Assigned, JobStatus::InProgress)
                | (JobStatus::Assigned, JobStatus::Requested)
                | (JobStatus::InProgress, JobStatus::Completed) => Ok(keep_or_release),
                _ => Err(TransitionError::NotPermitted(
                    "washers can start, release or complete their assigned jobs",
                )),
            }
        }
        Actor::Member(_) => Err(TransitionError::NotPermitted("this job belongs to someone else")),
    }
}

/// Applies a validated status change with compare-and-set, so a concurrent
/// writer gets `Conflict` instead of silently overwriting.
pub fn transition_job(
    conn: &Connection,
    job_id: &str,
    actor: Actor,
    next: JobStatus,
) -> Result<Job, TransitionError> {
    let job = queries::get_job(conn, job_id)?.ok_or(TransitionError::NotFound)?;
    apply_transition(conn, &job, actor, next)
}

/// Checks and writes a transition against `job` as it was read. The write only
/// lands if the stored status still equals `job.status`.
fn apply_transition(
    conn: &Connection,
    job: &Job,
    actor: Actor,
    next: JobStatus,
) -> Result<Job, TransitionError> {
    if !job.status.can_transition_to(next) {
        return Err(TransitionError::Invalid {
            from: job.status,
            to: next,
        });
    }

    let washer_id = authorize(job, actor, next)?;

    // Status change and completed-jobs counter commit together.
    let tx = conn
        .unchecked_transaction()
        .context("failed to start status transaction")?;
    let updated =
        queries::compare_and_set_status(&tx, &job.id, job.status, next, washer_id.as_deref())?;
    if !updated {
        return Err(TransitionError::Conflict);
    }

    if next == JobStatus::Completed {
        if let Some(washer) = &washer_id {
            queries::increment_completed_jobs(&tx, washer)?;
        }
    }
    tx.commit().context("failed to commit status change")?;

    let by = match actor {
        Actor::Admin => "admin",
        Actor::Member(user) => user.id.as_str(),
    };
    tracing::info!(job_id = %job.id, from = %job.status, to = %next, by, "job status changed");

    queries::get_job(conn, &job.id)?.ok_or(TransitionError::NotFound)
}

/// A verified washer claims an open request.
pub fn accept_job(conn: &Connection, job_id: &str, washer: &User) -> Result<Job, TransitionError> {
    if washer.role != Role::Washer {
        return Err(TransitionError::NotPermitted("only washers can accept jobs"));
    }
    transition_job(conn, job_id, Actor::Member(washer), JobStatus::Assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{GeoPoint, ServiceType, VehicleType};
    use chrono::Utc;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn add_user(conn: &Connection, id: &str, role: Role, verified: bool) -> User {
        let user = User::new(
            id.to_string(),
            id.to_string(),
            format!("{id}@example.com"),
            "0820000000".to_string(),
            role,
        );
        queries::insert_user(conn, &user).unwrap();
        if verified {
            queries::set_washer_verified(conn, id, true, &Utc::now().naive_utc()).unwrap();
        }
        queries::get_user(conn, id).unwrap().unwrap()
    }

    fn add_job(conn: &Connection, id: &str, owner: &str, washer: Option<&str>, status: JobStatus) {
        let now = Utc::now().naive_utc();
        queries::insert_job(
            conn,
            &Job {
                id: id.to_string(),
                owner_id: owner.to_string(),
                washer_id: washer.map(str::to_string),
                service_type: ServiceType::Exterior,
                vehicle_type: VehicleType::Sedan,
                pickup_location: GeoPoint::FALLBACK,
                price: ServiceType::Exterior.price(),
                status,
                scheduled_at: now,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_full_happy_path() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let washer = add_user(&conn, "w1", Role::Washer, true);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let job = accept_job(&conn, "j1", &washer).unwrap();
        assert_eq!(job.status, JobStatus::Assigned);
        assert_eq!(job.washer_id.as_deref(), Some("w1"));

        let job = transition_job(&conn, "j1", Actor::Member(&washer), JobStatus::InProgress).unwrap();
        assert_eq!(job.status, JobStatus::InProgress);

        let job = transition_job(&conn, "j1", Actor::Member(&washer), JobStatus::Completed).unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let profile = queries::get_user(&conn, "w1").unwrap().unwrap().washer_profile.unwrap();
        assert_eq!(profile.completed_jobs, 1);
    }

    #[test]
    fn test_unverified_washer_cannot_accept() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let washer = add_user(&conn, "w1", Role::Washer, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let result = accept_job(&conn, "j1", &washer);
        assert!(matches!(result, Err(TransitionError::WasherNotVerified)));
    }

    #[test]
    fn test_second_accept_loses() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let first = add_user(&conn, "w1", Role::Washer, true);
        let second = add_user(&conn, "w2", Role::Washer, true);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        accept_job(&conn, "j1", &first).unwrap();
        // Job is now ASSIGNED, so REQUESTED -> ASSIGNED no longer applies.
        let result = accept_job(&conn, "j1", &second);
        assert!(matches!(result, Err(TransitionError::Invalid { .. })));

        let job = queries::get_job(&conn, "j1").unwrap().unwrap();
        assert_eq!(job.washer_id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_owner_can_cancel_but_not_complete() {
        let conn = setup_db();
        let owner = add_user(&conn, "o1", Role::Owner, false);
        add_user(&conn, "w1", Role::Washer, true);
        add_job(&conn, "j1", "o1", Some("w1"), JobStatus::Assigned);

        let result = transition_job(&conn, "j1", Actor::Member(&owner), JobStatus::Completed);
        assert!(matches!(result, Err(TransitionError::NotPermitted(_))));

        let job = transition_job(&conn, "j1", Actor::Member(&owner), JobStatus::Cancelled).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn test_stranger_cannot_touch_job() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let other = add_user(&conn, "o2", Role::Owner, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let result = transition_job(&conn, "j1", Actor::Member(&other), JobStatus::Cancelled);
        assert!(matches!(result, Err(TransitionError::NotPermitted(_))));
    }

    #[test]
    fn test_washer_release_clears_assignment() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let washer = add_user(&conn, "w1", Role::Washer, true);
        add_job(&conn, "j1", "o1", Some("w1"), JobStatus::Assigned);

        let job = transition_job(&conn, "j1", Actor::Member(&washer), JobStatus::Requested).unwrap();
        assert_eq!(job.status, JobStatus::Requested);
        assert!(job.washer_id.is_none());
    }

    #[test]
    fn test_terminal_states_are_final_even_for_admin() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Completed);

        let result = transition_job(&conn, "j1", Actor::Admin, JobStatus::Requested);
        assert!(matches!(
            result,
            Err(TransitionError::Invalid {
                from: JobStatus::Completed,
                to: JobStatus::Requested
            })
        ));
    }

    #[test]
    fn test_admin_completes_assigned_job() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        add_user(&conn, "w1", Role::Washer, true);
        add_job(&conn, "j1", "o1", Some("w1"), JobStatus::Assigned);

        let job = transition_job(&conn, "j1", Actor::Admin, JobStatus::Completed).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.washer_id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_admin_cannot_assign_without_washer() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let result = transition_job(&conn, "j1", Actor::Admin, JobStatus::Assigned);
        assert!(matches!(result, Err(TransitionError::NotPermitted(_))));
    }

    #[test]
    fn test_requested_cannot_skip_to_completed() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let result = transition_job(&conn, "j1", Actor::Admin, JobStatus::Completed);
        assert!(matches!(result, Err(TransitionError::Invalid { .. })));
    }

    #[test]
    fn test_unknown_job() {
        let conn = setup_db();
        let result = transition_job(&conn, "missing", Actor::Admin, JobStatus::Cancelled);
        assert!(matches!(result, Err(TransitionError::NotFound)));
    }

    #[test]
    fn test_stale_read_conflicts() {
        let conn = setup_db();
        let owner = add_user(&conn, "o1", Role::Owner, false);
        add_job(&conn, "j1", "o1", None, JobStatus::Requested);

        let stale = queries::get_job(&conn, "j1").unwrap().unwrap();
        // Someone else cancels between our read and our write.
        transition_job(&conn, "j1", Actor::Admin, JobStatus::Cancelled).unwrap();

        let result = apply_transition(&conn, &stale, Actor::Member(&owner), JobStatus::Cancelled);
        assert!(matches!(result, Err(TransitionError::Conflict)));

        let job = queries::get_job(&conn, "j1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn test_completion_rolls_back_when_counter_fails() {
        let conn = setup_db();
        add_user(&conn, "o1", Role::Owner, false);
        let washer = add_user(&conn, "w1", Role::Washer, true);
        add_job(&conn, "j1", "o1", Some("w1"), JobStatus::InProgress);

        conn.execute_batch(
            "CREATE TRIGGER fail_counter BEFORE UPDATE OF completed_jobs ON washer_profiles
             BEGIN SELECT RAISE(ABORT, 'counter unavailable'); END;",
        )
        .unwrap();

        let result = transition_job(&conn, "j1", Actor::Member(&washer), JobStatus::Completed);
        assert!(matches!(result, Err(TransitionError::Storage(_))));

        let job = queries::get_job(&conn, "j1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        let profile = queries::get_user(&conn, "w1").unwrap().unwrap().washer_profile.unwrap();
        assert_eq!(profile.completed_jobs, 0);
    }
}
