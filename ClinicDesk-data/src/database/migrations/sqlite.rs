use rusqlite::Connection;
use tracing::info;

use crate::database::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_clinics_table(conn)?;
    create_users_table(conn)?;
    create_doctors_tables(conn)?;
    create_patients_table(conn)?;
    create_appointments_table(conn)?;
    create_prescriptions_table(conn)?;
    create_templates_table(conn)?;
    create_queue_table(conn)?;
    create_abha_tables(conn)?;
    create_referrals_table(conn)?;
    create_insurance_table(conn)?;
    create_medical_records_table(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

fn apply(conn: &Connection, name: &str, sql: &str) -> Result<(), DatabaseError> {
    info!("Creating {} if not exists", name);
    conn.execute_batch(sql)
        .map_err(|e| DatabaseError::MigrationError(format!("{}: {}", name, e)))
}

fn create_clinics_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "clinics",
        "CREATE TABLE IF NOT EXISTS clinics (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            phone TEXT,
            email TEXT,
            hfr_id TEXT UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
}

fn create_users_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('admin', 'doctor', 'receptionist')),
            clinic_id TEXT REFERENCES clinics(id) ON DELETE SET NULL,
            doctor_id TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );",
    )
}

fn create_doctors_tables(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "doctors",
        "CREATE TABLE IF NOT EXISTS doctors (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            specialization TEXT,
            registration_number TEXT,
            phone TEXT,
            email TEXT,
            consultation_fee REAL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_doctors_clinic ON doctors (clinic_id);",
    )?;

    apply(
        conn,
        "doctor_time_slots",
        "CREATE TABLE IF NOT EXISTS doctor_time_slots (
            id TEXT PRIMARY KEY,
            doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            slot_minutes INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_time_slots_doctor ON doctor_time_slots (doctor_id, day_of_week);",
    )
}

fn create_patients_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "patients",
        "CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            uhid TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            gender TEXT NOT NULL,
            date_of_birth TEXT,
            phone TEXT,
            email TEXT,
            address TEXT,
            blood_group TEXT,
            abha_number TEXT,
            abha_address TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_patients_clinic ON patients (clinic_id);
        CREATE INDEX IF NOT EXISTS idx_patients_phone ON patients (phone);",
    )
}

fn create_appointments_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "appointments",
        "CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            appointment_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT,
            status TEXT NOT NULL,
            reason TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_doctor_date
        ON appointments (doctor_id, appointment_date);
        CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments (patient_id);",
    )
}

fn create_prescriptions_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "prescriptions",
        "CREATE TABLE IF NOT EXISTS prescriptions (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
            diagnosis TEXT,
            medicines TEXT NOT NULL,
            advice TEXT,
            follow_up_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_prescriptions_patient
        ON prescriptions (patient_id, created_at DESC);",
    )
}

fn create_templates_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "templates",
        "CREATE TABLE IF NOT EXISTS templates (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            doctor_id TEXT REFERENCES doctors(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            template_type TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (clinic_id, name, template_type)
        );",
    )
}

fn create_queue_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "patient_queue",
        "CREATE TABLE IF NOT EXISTS patient_queue (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
            queue_date TEXT NOT NULL,
            token_number INTEGER NOT NULL,
            status TEXT NOT NULL,
            checked_in_at TEXT NOT NULL,
            called_at TEXT,
            completed_at TEXT,
            UNIQUE (doctor_id, queue_date, token_number)
        );",
    )
}

fn create_abha_tables(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "abha_sessions",
        "CREATE TABLE IF NOT EXISTS abha_sessions (
            id TEXT PRIMARY KEY,
            patient_id TEXT REFERENCES patients(id) ON DELETE CASCADE,
            flow TEXT NOT NULL,
            login_hint TEXT NOT NULL,
            txn_id TEXT,
            status TEXT NOT NULL,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );",
    )?;

    apply(
        conn,
        "abha_accounts",
        "CREATE TABLE IF NOT EXISTS abha_accounts (
            id TEXT PRIMARY KEY,
            patient_id TEXT UNIQUE REFERENCES patients(id) ON DELETE SET NULL,
            abha_number TEXT NOT NULL UNIQUE,
            abha_address TEXT,
            full_name TEXT,
            gender TEXT,
            date_of_birth TEXT,
            mobile TEXT,
            kyc_verified INTEGER NOT NULL DEFAULT 0,
            linked_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
}

fn create_referrals_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "referrals",
        "CREATE TABLE IF NOT EXISTS referrals (
            id TEXT PRIMARY KEY,
            clinic_id TEXT NOT NULL REFERENCES clinics(id) ON DELETE CASCADE,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            referring_doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
            referred_to_name TEXT NOT NULL,
            referred_to_specialty TEXT,
            referred_to_facility TEXT,
            reason TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
}

fn create_insurance_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "insurance_policies",
        "CREATE TABLE IF NOT EXISTS insurance_policies (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            provider_name TEXT NOT NULL,
            policy_number TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_until TEXT NOT NULL,
            coverage_amount REAL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (provider_name, policy_number)
        );",
    )
}

fn create_medical_records_table(conn: &Connection) -> Result<(), DatabaseError> {
    apply(
        conn,
        "medical_records",
        "CREATE TABLE IF NOT EXISTS medical_records (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
            record_type TEXT NOT NULL,
            title TEXT NOT NULL,
            file_name TEXT NOT NULL,
            stored_path TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            uploaded_by TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_medical_records_patient
        ON medical_records (patient_id, created_at DESC);",
    )
}
