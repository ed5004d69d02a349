use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{GeoPoint, Job, JobStatus, Role, ServiceType, User, VehicleType, WasherProfile};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid timestamp {s:?}: {e}"))
}

fn now_ts() -> String {
    format_ts(&Utc::now().naive_utc())
}

// ── Users ──

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.phone, u.role, u.profile_photo_url, u.created_at, \
     wp.user_id, wp.verified, wp.verified_at, wp.rating, wp.completed_jobs, wp.equipment, wp.id_doc_url, wp.selfie_url";

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, phone, role, profile_photo_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.role.as_str(),
            user.profile_photo_url,
            format_ts(&user.created_at),
        ],
    )?;

    if let Some(profile) = &user.washer_profile {
        conn.execute(
            "INSERT INTO washer_profiles (user_id, verified, verified_at, rating, completed_jobs, equipment, id_doc_url, selfie_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                profile.verified as i32,
                profile.verified_at.as_ref().map(format_ts),
                profile.rating,
                profile.completed_jobs,
                serde_json::to_string(&profile.equipment)?,
                profile.id_doc_url,
                profile.selfie_url,
            ],
        )?;
    }
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         LEFT JOIN washer_profiles wp ON wp.user_id = u.id
         WHERE u.id = ?1"
    );
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?;

    result.transpose()
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         LEFT JOIN washer_profiles wp ON wp.user_id = u.id
         ORDER BY u.created_at DESC, u.id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

/// Washers an owner may pick when booking. Unverified washers never appear.
pub fn list_verified_washers(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         INNER JOIN washer_profiles wp ON wp.user_id = u.id
         WHERE u.role = 'washer' AND wp.verified = 1
         ORDER BY wp.rating DESC, u.name ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut washers = vec![];
    for row in rows {
        washers.push(row??);
    }
    Ok(washers)
}

pub fn update_user_contact(
    conn: &Connection,
    id: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET
           name = COALESCE(?2, name),
           phone = COALESCE(?3, phone),
           updated_at = ?4
         WHERE id = ?1",
        params![id, name, phone, now_ts()],
    )?;
    Ok(count > 0)
}

pub fn update_washer_documents(
    conn: &Connection,
    user_id: &str,
    equipment: Option<&[String]>,
    id_doc_url: Option<&str>,
    selfie_url: Option<&str>,
) -> anyhow::Result<bool> {
    let equipment_json = equipment.map(serde_json::to_string).transpose()?;
    let count = conn.execute(
        "UPDATE washer_profiles SET
           equipment = COALESCE(?2, equipment),
           id_doc_url = COALESCE(?3, id_doc_url),
           selfie_url = COALESCE(?4, selfie_url)
         WHERE user_id = ?1",
        params![user_id, equipment_json, id_doc_url, selfie_url],
    )?;
    Ok(count > 0)
}

/// Setting `verified` keeps the first `verified_at`; clearing it drops the timestamp.
pub fn set_washer_verified(
    conn: &Connection,
    user_id: &str,
    verified: bool,
    at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = if verified {
        conn.execute(
            "UPDATE washer_profiles SET verified = 1, verified_at = COALESCE(verified_at, ?2)
             WHERE user_id = ?1",
            params![user_id, format_ts(at)],
        )?
    } else {
        conn.execute(
            "UPDATE washer_profiles SET verified = 0, verified_at = NULL WHERE user_id = ?1",
            params![user_id],
        )?
    };
    Ok(count > 0)
}

pub fn increment_completed_jobs(conn: &Connection, washer_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE washer_profiles SET completed_jobs = completed_jobs + 1 WHERE user_id = ?1",
        params![washer_id],
    )?;
    Ok(())
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(4)?;
    let role = Role::parse(&role_str).ok_or_else(|| anyhow::anyhow!("unknown role: {role_str}"))?;
    let created_at_str: String = row.get(6)?;

    let profile_user_id: Option<String> = row.get(7)?;
    let washer_profile = match profile_user_id {
        Some(_) => {
            let verified_at: Option<String> = row.get(9)?;
            let equipment_json: String = row.get(12)?;
            Some(WasherProfile {
                verified: row.get::<_, i32>(8)? != 0,
                verified_at: verified_at.as_deref().map(parse_ts).transpose()?,
                rating: row.get(10)?,
                completed_jobs: row.get(11)?,
                equipment: serde_json::from_str(&equipment_json)
                    .with_context(|| format!("corrupt equipment list: {equipment_json}"))?,
                id_doc_url: row.get(13)?,
                selfie_url: row.get(14)?,
            })
        }
        None => None,
    };

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role,
        profile_photo_url: row.get(5)?,
        washer_profile,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Jobs ──

const JOB_COLUMNS: &str = "id, owner_id, washer_id, service_type, vehicle_type, pickup_lat, pickup_lng, \
     price, status, scheduled_at, created_at, updated_at";

pub fn insert_job(conn: &Connection, job: &Job) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO jobs (id, owner_id, washer_id, service_type, vehicle_type, pickup_lat, pickup_lng, price, status, scheduled_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            job.id,
            job.owner_id,
            job.washer_id,
            job.service_type.as_str(),
            job.vehicle_type.as_str(),
            job.pickup_location.lat,
            job.pickup_location.lng,
            job.price,
            job.status.as_str(),
            format_ts(&job.scheduled_at),
            format_ts(&job.created_at),
            format_ts(&job.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_job(conn: &Connection, id: &str) -> anyhow::Result<Option<Job>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_job_row(row)))
        .optional()?;

    result.transpose()
}

pub fn list_jobs_for_owner(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<Job>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE owner_id = ?1 ORDER BY created_at DESC");
    query_jobs(conn, &sql, params![owner_id])
}

pub fn list_jobs_for_washer(conn: &Connection, washer_id: &str) -> anyhow::Result<Vec<Job>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE washer_id = ?1 ORDER BY created_at DESC");
    query_jobs(conn, &sql, params![washer_id])
}

/// Unassigned requests, soonest first.
pub fn list_open_jobs(conn: &Connection) -> anyhow::Result<Vec<Job>> {
    let sql = format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'REQUESTED' AND washer_id IS NULL ORDER BY scheduled_at ASC"
    );
    query_jobs(conn, &sql, [])
}

pub fn list_all_jobs(
    conn: &Connection,
    status_filter: Option<JobStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Job>> {
    match status_filter {
        Some(status) => {
            let sql = format!(
                "SELECT {JOB_COLUMNS} FROM jobs WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            );
            query_jobs(conn, &sql, params![status.as_str(), limit])
        }
        None => {
            let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC LIMIT ?1");
            query_jobs(conn, &sql, params![limit])
        }
    }
}

/// Moves a job from `expected` to `next` only if nobody changed it in between.
/// Returns false when the stored status no longer matches `expected`.
pub fn compare_and_set_status(
    conn: &Connection,
    id: &str,
    expected: JobStatus,
    next: JobStatus,
    washer_id: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE jobs SET status = ?1, washer_id = ?2, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![next.as_str(), washer_id, now_ts(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

fn query_jobs<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> anyhow::Result<Vec<Job>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_job_row(row)))?;

    let mut jobs = vec![];
    for row in rows {
        jobs.push(row??);
    }
    Ok(jobs)
}

fn parse_job_row(row: &rusqlite::Row) -> anyhow::Result<Job> {
    let service_str: String = row.get(3)?;
    let vehicle_str: String = row.get(4)?;
    let status_str: String = row.get(8)?;
    let scheduled_at_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Job {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        washer_id: row.get(2)?,
        service_type: ServiceType::parse(&service_str)
            .ok_or_else(|| anyhow::anyhow!("unknown service type: {service_str}"))?,
        vehicle_type: VehicleType::parse(&vehicle_str)
            .ok_or_else(|| anyhow::anyhow!("unknown vehicle type: {vehicle_str}"))?,
        pickup_location: GeoPoint {
            lat: row.get(5)?,
            lng: row.get(6)?,
        },
        price: row.get(7)?,
        status: JobStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown job status: {status_str}"))?,
        scheduled_at: parse_ts(&scheduled_at_str)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

// ── Stats ──

pub struct UserCounts {
    pub total: i64,
    pub owners: i64,
    pub washers: i64,
    pub verified_washers: i64,
}

pub fn get_user_counts(conn: &Connection) -> anyhow::Result<UserCounts> {
    let counts = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN u.role = 'owner' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN u.role = 'washer' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN u.role = 'washer' AND wp.verified = 1 THEN 1 ELSE 0 END), 0)
         FROM users u
         LEFT JOIN washer_profiles wp ON wp.user_id = u.id",
        [],
        |row| {
            Ok(UserCounts {
                total: row.get(0)?,
                owners: row.get(1)?,
                washers: row.get(2)?,
                verified_washers: row.get(3)?,
            })
        },
    )?;
    Ok(counts)
}

pub struct JobCounts {
    pub total: i64,
    pub requested: i64,
    pub completed: i64,
    pub completed_revenue: i64,
}

pub fn get_job_counts(conn: &Connection) -> anyhow::Result<JobCounts> {
    let counts = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = 'REQUESTED' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN price ELSE 0 END), 0)
         FROM jobs",
        [],
        |row| {
            Ok(JobCounts {
                total: row.get(0)?,
                requested: row.get(1)?,
                completed: row.get(2)?,
                completed_revenue: row.get(3)?,
            })
        },
    )?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn make_user(conn: &Connection, id: &str, role: Role) -> User {
        let user = User::new(
            id.to_string(),
            format!("User {id}"),
            format!("{id}@example.com"),
            "0820000000".to_string(),
            role,
        );
        insert_user(conn, &user).unwrap();
        user
    }

    fn make_job(conn: &Connection, id: &str, owner_id: &str, status: JobStatus) -> Job {
        let now = Utc::now().naive_utc();
        let job = Job {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            washer_id: None,
            service_type: ServiceType::Both,
            vehicle_type: VehicleType::Sedan,
            pickup_location: GeoPoint { lat: -26.2, lng: 28.04 },
            price: ServiceType::Both.price(),
            status,
            scheduled_at: dt("2030-01-10 09:00"),
            created_at: now,
            updated_at: now,
        };
        insert_job(conn, &job).unwrap();
        job
    }

    #[test]
    fn test_user_roundtrip_with_profile() {
        let conn = setup_db();
        make_user(&conn, "w1", Role::Washer);

        let loaded = get_user(&conn, "w1").unwrap().unwrap();
        assert_eq!(loaded.role, Role::Washer);
        let profile = loaded.washer_profile.unwrap();
        assert!(!profile.verified);
        assert!(profile.verified_at.is_none());
    }

    #[test]
    fn test_get_missing_user() {
        let conn = setup_db();
        assert!(get_user(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn test_unverified_washer_not_listed() {
        let conn = setup_db();
        make_user(&conn, "w1", Role::Washer);
        make_user(&conn, "w2", Role::Washer);
        make_user(&conn, "o1", Role::Owner);

        assert!(list_verified_washers(&conn).unwrap().is_empty());

        set_washer_verified(&conn, "w2", true, &Utc::now().naive_utc()).unwrap();
        let washers = list_verified_washers(&conn).unwrap();
        assert_eq!(washers.len(), 1);
        assert_eq!(washers[0].id, "w2");
    }

    #[test]
    fn test_verify_keeps_first_timestamp() {
        let conn = setup_db();
        make_user(&conn, "w1", Role::Washer);

        let first = dt("2025-01-01 10:00");
        let second = dt("2025-02-01 10:00");
        assert!(set_washer_verified(&conn, "w1", true, &first).unwrap());
        assert!(set_washer_verified(&conn, "w1", true, &second).unwrap());

        let profile = get_user(&conn, "w1").unwrap().unwrap().washer_profile.unwrap();
        assert!(profile.verified);
        assert_eq!(profile.verified_at, Some(first));
    }

    #[test]
    fn test_verify_owner_touches_nothing() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        assert!(!set_washer_verified(&conn, "o1", true, &Utc::now().naive_utc()).unwrap());
    }

    #[test]
    fn test_update_washer_documents_partial() {
        let conn = setup_db();
        make_user(&conn, "w1", Role::Washer);

        let equipment = vec!["pressure washer".to_string(), "vacuum".to_string()];
        update_washer_documents(&conn, "w1", Some(&equipment), Some("https://docs/id.pdf"), None).unwrap();
        update_washer_documents(&conn, "w1", None, None, Some("https://docs/selfie.jpg")).unwrap();

        let profile = get_user(&conn, "w1").unwrap().unwrap().washer_profile.unwrap();
        assert_eq!(profile.equipment, equipment);
        assert_eq!(profile.id_doc_url.as_deref(), Some("https://docs/id.pdf"));
        assert_eq!(profile.selfie_url.as_deref(), Some("https://docs/selfie.jpg"));
    }

    #[test]
    fn test_compare_and_set_detects_stale_status() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        make_user(&conn, "w1", Role::Washer);
        make_user(&conn, "w2", Role::Washer);
        make_job(&conn, "j1", "o1", JobStatus::Requested);

        assert!(compare_and_set_status(&conn, "j1", JobStatus::Requested, JobStatus::Assigned, Some("w1")).unwrap());
        // Second writer still believes the job is REQUESTED
        assert!(!compare_and_set_status(&conn, "j1", JobStatus::Requested, JobStatus::Assigned, Some("w2")).unwrap());

        let job = get_job(&conn, "j1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Assigned);
        assert_eq!(job.washer_id.as_deref(), Some("w1"));
    }

    #[test]
    fn test_legacy_status_rows_parse() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        make_job(&conn, "j1", "o1", JobStatus::Requested);
        conn.execute("UPDATE jobs SET status = 'pending' WHERE id = 'j1'", [])
            .unwrap();

        let job = get_job(&conn, "j1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Requested);
    }

    #[test]
    fn test_open_jobs_excludes_assigned() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        make_job(&conn, "j1", "o1", JobStatus::Requested);
        make_job(&conn, "j2", "o1", JobStatus::Cancelled);

        let open = list_open_jobs(&conn).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "j1");
    }

    #[test]
    fn test_job_counts_revenue_only_completed() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        make_job(&conn, "j1", "o1", JobStatus::Completed);
        make_job(&conn, "j2", "o1", JobStatus::Completed);
        make_job(&conn, "j3", "o1", JobStatus::Requested);
        make_job(&conn, "j4", "o1", JobStatus::Cancelled);

        let counts = get_job_counts(&conn).unwrap();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.requested, 1);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.completed_revenue, 2 * ServiceType::Both.price());
    }

    #[test]
    fn test_user_counts() {
        let conn = setup_db();
        make_user(&conn, "o1", Role::Owner);
        make_user(&conn, "w1", Role::Washer);
        make_user(&conn, "w2", Role::Washer);
        set_washer_verified(&conn, "w1", true, &Utc::now().naive_utc()).unwrap();

        let counts = get_user_counts(&conn).unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.owners, 1);
        assert_eq!(counts.washers, 2);
        assert_eq!(counts.verified_washers, 1);
    }

    #[test]
    fn test_empty_counts_are_zero() {
        let conn = setup_db();
        let counts = get_job_counts(&conn).unwrap();
        assert_eq!(counts.total, 0);
        assert_eq!(counts.completed_revenue, 0);
    }

    #[test]
    fn test_corrupt_equipment_is_an_error() {
        let conn = setup_db();
        make_user(&conn, "w1", Role::Washer);
        conn.execute(
            "UPDATE washer_profiles SET equipment = 'not json' WHERE user_id = 'w1'",
            [],
        )
        .unwrap();

        assert!(get_user(&conn, "w1").is_err());
    }
}
