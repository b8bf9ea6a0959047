//! 查询、过滤与分页

use crate::models::*;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

pub const MIN_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 30;

/// 患者快速搜索返回的最大条数
pub const QUICK_SEARCH_LIMIT: i64 = 10;

/// 各列表的每页条数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSizes {
    pub doctors: i64,
    pub patients: i64,
    pub appointments: i64,
    pub bills: i64,
    pub medical_records: i64,
    pub rooms: i64,
    pub departments: i64,
    pub reports: i64,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            doctors: 10,
            patients: 15,
            appointments: 20,
            bills: 15,
            medical_records: 10,
            rooms: 30,
            departments: 20,
            reports: 20,
        }
    }
}

impl PageSizes {
    /// 超出 10..=30 范围的列表名
    pub fn out_of_range(&self) -> Vec<&'static str> {
        [
            ("doctors", self.doctors),
            ("patients", self.patients),
            ("appointments", self.appointments),
            ("bills", self.bills),
            ("medical_records", self.medical_records),
            ("rooms", self.rooms),
            ("departments", self.departments),
            ("reports", self.reports),
        ]
        .into_iter()
        .filter(|(_, size)| !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(size))
        .map(|(name, _)| name)
        .collect()
    }
}

/// 分页请求，页码从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1),
            per_page: per_page.max(1),
        }
    }

    /// 取前 `limit` 条
    pub fn first(limit: i64) -> Self {
        Self::new(Some(1), limit)
    }

    /// 根据总数把页码限制在有效范围内，返回 (页码, 偏移量)
    pub fn window(&self, total: i64) -> (i64, i64) {
        let page = self.page.clamp(1, total_pages(total, self.per_page));
        (page, (page - 1) * self.per_page)
    }
}

/// 总页数，空结果也有一页
pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        let pages = total_pages(total, per_page);
        Self {
            items,
            page,
            per_page,
            total,
            total_pages: pages,
            has_next: page < pages,
            has_previous: page > 1,
        }
    }

    /// 对已排序的完整结果分页
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let (page, offset) = request.window(total);
        let items = all
            .into_iter()
            .skip(offset as usize)
            .take(request.per_page as usize)
            .collect();
        Self::new(items, page, request.per_page, total)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

/// 忽略大小写的子串匹配
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn eq_or_any<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
    filter.as_ref().map_or(true, |f| f == value)
}

/// 医生列表过滤：姓名/专科/执照号搜索，专科精确过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    pub search: Option<String>,
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl DoctorFilter {
    pub fn search_term(&self) -> Option<&str> {
        search_term(&self.search)
    }

    pub fn matches(&self, doctor: &Doctor) -> bool {
        let searched = self.search_term().map_or(true, |term| {
            contains_ci(&doctor.name, term)
                || contains_ci(doctor.specialty.as_str(), term)
                || contains_ci(&doctor.license_number, term)
        });
        searched
            && (self.include_inactive || doctor.is_active)
            && eq_or_any(&self.specialty, &doctor.specialty)
    }
}

/// 患者列表过滤：姓名/电话/诊断搜索，状态精确过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub status: Option<PatientStatus>,
}

impl PatientFilter {
    pub fn search_term(&self) -> Option<&str> {
        search_term(&self.search)
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        let searched = self.search_term().map_or(true, |term| {
            contains_ci(&patient.name, term)
                || contains_ci(&patient.phone, term)
                || contains_ci(&patient.diagnosis, term)
        });
        searched && eq_or_any(&self.status, &patient.status)
    }
}

/// 预约列表过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        eq_or_any(&self.date, &appointment.appointment_date)
            && eq_or_any(&self.doctor_id, &appointment.doctor_id)
            && eq_or_any(&self.patient_id, &appointment.patient_id)
            && eq_or_any(&self.status, &appointment.status)
    }
}

/// 账单列表过滤：患者姓名/账单编号搜索
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillFilter {
    pub search: Option<String>,
    pub status: Option<BillStatus>,
    pub patient_id: Option<Uuid>,
}

impl BillFilter {
    pub fn search_term(&self) -> Option<&str> {
        search_term(&self.search)
    }

    pub fn matches(&self, bill: &Bill, patient_name: &str) -> bool {
        let searched = self.search_term().map_or(true, |term| {
            contains_ci(patient_name, term) || contains_ci(&bill.bill_number, term)
        });
        searched
            && eq_or_any(&self.status, &bill.status)
            && eq_or_any(&self.patient_id, &bill.patient_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
    pub department_id: Option<Uuid>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        eq_or_any(&self.status, &room.status)
            && eq_or_any(&self.room_type, &room.room_type)
            && self
                .department_id
                .map_or(true, |id| room.department_id == Some(id))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentFilter {
    #[serde(default)]
    pub include_inactive: bool,
}

impl DepartmentFilter {
    pub fn matches(&self, department: &Department) -> bool {
        self.include_inactive || department.is_active
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub report_type: Option<ReportType>,
    pub status: Option<ReportStatus>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        eq_or_any(&self.report_type, &report.report_type)
            && eq_or_any(&self.status, &report.status)
    }
}

/// 各实体的默认排序，相同时按 id 排序保证稳定
pub mod ordering {
    use super::*;

    pub fn doctors(a: &Doctor, b: &Doctor) -> Ordering {
        a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
    }

    pub fn patients(a: &Patient, b: &Patient) -> Ordering {
        b.admitted_date
            .cmp(&a.admitted_date)
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn appointments(a: &Appointment, b: &Appointment) -> Ordering {
        a.appointment_date
            .cmp(&b.appointment_date)
            .then_with(|| a.appointment_time.cmp(&b.appointment_time))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn bills(a: &Bill, b: &Bill) -> Ordering {
        b.bill_date.cmp(&a.bill_date).then_with(|| a.id.cmp(&b.id))
    }

    pub fn bill_items(a: &BillItem, b: &BillItem) -> Ordering {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn departments(a: &Department, b: &Department) -> Ordering {
        a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
    }

    pub fn rooms(a: &Room, b: &Room) -> Ordering {
        a.room_number
            .cmp(&b.room_number)
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn medical_records(a: &MedicalRecord, b: &MedicalRecord) -> Ordering {
        b.visit_date
            .cmp(&a.visit_date)
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn reports(a: &Report, b: &Report) -> Ordering {
        b.report_date
            .cmp(&a.report_date)
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 15), 1);
        assert_eq!(total_pages(15, 15), 1);
        assert_eq!(total_pages(16, 15), 2);
    }

    #[test]
    fn test_out_of_range_pages_clamp() {
        let items: Vec<i32> = (1..=25).collect();

        let last = Page::from_sorted(items.clone(), PageRequest::new(Some(99), 10));
        assert_eq!(last.page, 3);
        assert_eq!(last.items, vec![21, 22, 23, 24, 25]);
        assert!(!last.has_next);
        assert!(last.has_previous);

        let first = Page::from_sorted(items.clone(), PageRequest::new(Some(-4), 10));
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 10);

        let default = Page::from_sorted(items, PageRequest::new(None, 10));
        assert_eq!(default.page, 1);
        assert_eq!(default.total_pages, 3);
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let page = Page::from_sorted(Vec::<i32>::new(), PageRequest::new(Some(3), 15));
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn test_window_offsets() {
        let request = PageRequest::new(Some(2), 20);
        assert_eq!(request.window(45), (2, 20));
        assert_eq!(request.window(10), (1, 0));
    }

    #[test]
    fn test_page_sizes_range() {
        assert!(PageSizes::default().out_of_range().is_empty());
        let sizes = PageSizes {
            rooms: 50,
            bills: 5,
            ..PageSizes::default()
        };
        assert_eq!(sizes.out_of_range(), vec!["bills", "rooms"]);
    }

    #[test]
    fn test_contains_ci() {
        assert!(contains_ci("Margaret Smith", "SMITH"));
        assert!(!contains_ci("Margaret Smith", "jones"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = PatientFilter {
            search: Some("   ".to_string()),
            status: None,
        };
        assert_eq!(filter.search_term(), None);
    }
}
