//! 表结构
//!
//! 约束名沿用 PostgreSQL 默认命名（`<table>_<column>_key` / `_fkey`），
//! 错误转换依赖这些名字找到对应字段。

use hospital_core::Result;
use sqlx::PgPool;
use tracing::info;

/// 建表语句，按外键依赖顺序排列
const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS doctors (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        specialty VARCHAR(50) NOT NULL,
        phone VARCHAR(17) NOT NULL UNIQUE,
        email VARCHAR(254) NOT NULL UNIQUE,
        license_number VARCHAR(50) NOT NULL UNIQUE,
        years_of_experience INTEGER NOT NULL DEFAULT 0 CHECK (years_of_experience >= 0),
        qualification TEXT NOT NULL DEFAULT '',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        age INTEGER NOT NULL CHECK (age >= 0),
        gender VARCHAR(10) NOT NULL,
        phone VARCHAR(17) NOT NULL,
        email VARCHAR(254),
        address TEXT NOT NULL,
        blood_group VARCHAR(5),
        emergency_contact VARCHAR(100) NOT NULL,
        emergency_phone VARCHAR(17) NOT NULL,
        diagnosis TEXT NOT NULL,
        medical_history TEXT NOT NULL DEFAULT '',
        allergies TEXT NOT NULL DEFAULT '',
        current_medications TEXT NOT NULL DEFAULT '',
        assigned_doctor_id UUID REFERENCES doctors(id) ON DELETE SET NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        admitted_date DATE NOT NULL,
        discharge_date DATE,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        head_doctor_id UUID UNIQUE REFERENCES doctors(id) ON DELETE SET NULL,
        location VARCHAR(100) NOT NULL DEFAULT '',
        phone VARCHAR(17) NOT NULL DEFAULT '',
        email VARCHAR(254) NOT NULL DEFAULT '',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id UUID PRIMARY KEY,
        room_number VARCHAR(10) NOT NULL UNIQUE,
        room_type VARCHAR(20) NOT NULL,
        department_id UUID REFERENCES departments(id) ON DELETE SET NULL,
        capacity INTEGER NOT NULL DEFAULT 1 CHECK (capacity >= 1),
        floor INTEGER NOT NULL CHECK (floor >= 0),
        status VARCHAR(20) NOT NULL DEFAULT 'available',
        daily_rate NUMERIC(8, 2) NOT NULL DEFAULT 0,
        amenities TEXT NOT NULL DEFAULT '',
        current_patient_id UUID UNIQUE REFERENCES patients(id) ON DELETE SET NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id UUID PRIMARY KEY,
        patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
        doctor_id UUID NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
        appointment_date DATE NOT NULL,
        appointment_time TIME NOT NULL,
        appointment_type VARCHAR(20) NOT NULL DEFAULT 'consultation',
        duration_minutes INTEGER NOT NULL DEFAULT 30 CHECK (duration_minutes > 0),
        reason TEXT NOT NULL,
        notes TEXT NOT NULL DEFAULT '',
        status VARCHAR(20) NOT NULL DEFAULT 'scheduled',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT appointments_doctor_slot_key UNIQUE (doctor_id, appointment_date, appointment_time)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bills (
        id UUID PRIMARY KEY,
        patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
        bill_number VARCHAR(20) NOT NULL UNIQUE,
        total_amount NUMERIC(10, 2) NOT NULL,
        paid_amount NUMERIC(10, 2) NOT NULL DEFAULT 0,
        discount_amount NUMERIC(10, 2) NOT NULL DEFAULT 0,
        tax_amount NUMERIC(10, 2) NOT NULL DEFAULT 0,
        status VARCHAR(20) NOT NULL DEFAULT 'unpaid',
        payment_method VARCHAR(20),
        bill_date DATE NOT NULL,
        due_date DATE NOT NULL,
        payment_date DATE,
        description TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bill_items (
        id UUID PRIMARY KEY,
        bill_id UUID NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
        item_type VARCHAR(20) NOT NULL,
        description VARCHAR(200) NOT NULL,
        quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity > 0),
        unit_price NUMERIC(8, 2) NOT NULL,
        total_price NUMERIC(8, 2) NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS medical_records (
        id UUID PRIMARY KEY,
        patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
        doctor_id UUID REFERENCES doctors(id) ON DELETE SET NULL,
        visit_date TIMESTAMP WITH TIME ZONE NOT NULL,
        symptoms TEXT NOT NULL,
        diagnosis TEXT NOT NULL,
        treatment TEXT NOT NULL,
        prescription TEXT NOT NULL DEFAULT '',
        follow_up_date DATE,
        notes TEXT NOT NULL DEFAULT '',
        attachment VARCHAR(512),
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id UUID PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        report_type VARCHAR(30) NOT NULL,
        summary TEXT NOT NULL,
        detailed_content TEXT NOT NULL DEFAULT '',
        generated_by VARCHAR(150),
        status VARCHAR(20) NOT NULL DEFAULT 'draft',
        report_date DATE NOT NULL,
        period_start DATE,
        period_end DATE,
        file_attachment VARCHAR(512),
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_doctors_name ON doctors(name)",
    "CREATE INDEX IF NOT EXISTS idx_doctors_specialty ON doctors(specialty)",
    "CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name)",
    "CREATE INDEX IF NOT EXISTS idx_patients_admitted_date ON patients(admitted_date)",
    "CREATE INDEX IF NOT EXISTS idx_patients_assigned_doctor_id ON patients(assigned_doctor_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_appointments_date_time ON appointments(appointment_date, appointment_time)",
    "CREATE INDEX IF NOT EXISTS idx_bills_patient_id ON bills(patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_bills_bill_date ON bills(bill_date)",
    "CREATE INDEX IF NOT EXISTS idx_bills_status ON bills(status)",
    "CREATE INDEX IF NOT EXISTS idx_bill_items_bill_id ON bill_items(bill_id)",
    "CREATE INDEX IF NOT EXISTS idx_rooms_department_id ON rooms(department_id)",
    "CREATE INDEX IF NOT EXISTS idx_medical_records_patient_id ON medical_records(patient_id, visit_date)",
    "CREATE INDEX IF NOT EXISTS idx_reports_report_date ON reports(report_date)",
];

/// 创建全部表，可重复执行
pub async fn create_tables(pool: &PgPool) -> Result<()> {
    for table_sql in TABLES {
        sqlx::query(table_sql).execute(pool).await?;
    }
    create_indexes(pool).await?;

    info!("Database tables created successfully");
    Ok(())
}

/// 创建查询索引
async fn create_indexes(pool: &PgPool) -> Result<()> {
    for index_sql in INDEXES {
        sqlx::query(index_sql).execute(pool).await?;
    }

    info!("Database indexes created successfully");
    Ok(())
}
