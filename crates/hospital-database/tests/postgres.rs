//! PostgreSQL 存储集成测试
//!
//! 需要可用的数据库：`DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::{NaiveDate, NaiveTime};
use hospital_core::*;
use hospital_database::{DatabasePool, DatabaseQueries, PoolSettings};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

async fn service() -> anyhow::Result<HospitalService> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = DatabasePool::connect(&url, &PoolSettings::default()).await?;
    let queries = DatabaseQueries::new(pool);
    queries.create_tables().await?;
    Ok(HospitalService::new(Arc::new(queries), PageSizes::default()))
}

/// 每个测试使用不同的电话/邮箱/执照号
fn unique_doctor() -> NewDoctor {
    let tag = Uuid::new_v4().simple().to_string();
    let digits: String = tag
        .bytes()
        .map(|b| char::from(b'0' + b % 10))
        .take(10)
        .collect();
    NewDoctor {
        name: format!("Dr. {}", &tag[..8]),
        specialty: Specialty::Cardiology,
        phone: format!("+1{}", digits),
        email: format!("{}@hospital.org", &tag[..12]),
        license_number: format!("LIC-{}", &tag[..12]),
        years_of_experience: 3,
        qualification: "MD".to_string(),
        is_active: true,
    }
}

fn patient(name: &str, doctor_id: Option<Uuid>) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        age: 52,
        gender: Gender::Female,
        phone: "+441234567890".to_string(),
        email: None,
        address: "2 Station Road".to_string(),
        blood_group: Some(BloodGroup::OPositive),
        emergency_contact: "Sam".to_string(),
        emergency_phone: "0123456789".to_string(),
        diagnosis: "Hypertension".to_string(),
        medical_history: String::new(),
        allergies: String::new(),
        current_medications: String::new(),
        assigned_doctor_id: doctor_id,
        status: None,
        admitted_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        discharge_date: None,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_license_is_a_conflict() -> anyhow::Result<()> {
    let service = service().await?;
    let new = unique_doctor();
    service.create_doctor(new.clone()).await?;

    let mut copy = unique_doctor();
    copy.license_number = new.license_number.clone();
    let err = service.create_doctor(copy).await.unwrap_err();
    assert!(matches!(err, HospitalError::Conflict(_)), "{:?}", err);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn double_booking_is_rejected() -> anyhow::Result<()> {
    let service = service().await?;
    let doctor = service.create_doctor(unique_doctor()).await?;
    let patient = service.create_patient(patient("Ada Booking", None)).await?;
    let at = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
    let day = NaiveDate::from_ymd_opt(2030, 5, 6).unwrap();
    let booking = NewAppointment {
        patient_id: patient.id,
        doctor_id: doctor.id,
        appointment_date: day,
        appointment_time: at,
        appointment_type: None,
        duration_minutes: 30,
        reason: "Checkup".to_string(),
        notes: String::new(),
    };

    service.create_appointment(booking.clone()).await?;
    let err = service.create_appointment(booking).await.unwrap_err();
    assert!(matches!(err, HospitalError::Conflict(_)), "{:?}", err);

    let free = service.doctor_availability(doctor.id, day).await?;
    assert_eq!(free.len(), 15);
    assert!(!free.contains(&at));
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn bill_numbers_are_sequential_and_items_persist() -> anyhow::Result<()> {
    let service = service().await?;
    let patient = service.create_patient(patient("Bill Payer", None)).await?;
    let new_bill = |items: Vec<NewBillItem>| NewBill {
        patient_id: patient.id,
        total_amount: Decimal::new(15000, 2),
        paid_amount: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        status: None,
        payment_method: None,
        bill_date: None,
        due_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        payment_date: None,
        description: String::new(),
        items,
    };

    let first = service
        .create_bill(new_bill(vec![NewBillItem {
            item_type: BillItemType::Medicine,
            description: "Aspirin".to_string(),
            quantity: 3,
            unit_price: Decimal::new(250, 2),
        }]))
        .await?;
    let second = service.create_bill(new_bill(Vec::new())).await?;

    let suffix = |number: &str| number["BILL-".len()..].parse::<u64>().unwrap();
    assert!(suffix(&second.bill.bill.bill_number) > suffix(&first.bill.bill.bill_number));

    let detail = service.bill_detail(first.bill.bill.id).await?;
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].total_price, Decimal::new(750, 2));
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn deleting_a_doctor_keeps_patients() -> anyhow::Result<()> {
    let service = service().await?;
    let doctor = service.create_doctor(unique_doctor()).await?;
    let patient = service
        .create_patient(patient("Orphaned Patient", Some(doctor.id)))
        .await?;

    service.delete_doctor(doctor.id).await?;
    let reloaded = service.get_patient(patient.id).await?;
    assert_eq!(reloaded.assigned_doctor_id, None);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn unknown_assigned_doctor_is_a_validation_error() -> anyhow::Result<()> {
    let service = service().await?;
    let err = service
        .create_patient(patient("Nobody's Patient", Some(Uuid::new_v4())))
        .await
        .unwrap_err();

    match err {
        HospitalError::Validation(errors) => assert!(errors.contains("assigned_doctor_id")),
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn search_matches_case_insensitively() -> anyhow::Result<()> {
    let service = service().await?;
    let marker = Uuid::new_v4().simple().to_string()[..10].to_string();
    service
        .create_patient(patient(&format!("Zed {}", marker.to_uppercase()), None))
        .await?;

    let found = service.search_patients(&marker).await?;
    assert_eq!(found.len(), 1);
    assert!(found[0].name.ends_with(&marker.to_uppercase()));
    Ok(())
}
