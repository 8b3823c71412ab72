use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{
    Appointment, Doctor, FavoriteDoctor, NewPatient, Patient, Review, Specialty,
    WeeklyAvailability,
};

use crate::store::{AppointmentQuery, DoctorQuery, SchedulingStore, StoreError, StoreResult};

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT: &str = "resolution=merge-duplicates,return=representation";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_token: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_token: config.supabase_service_token.clone(),
        }
    }

    fn get_headers(&self, prefer: Option<&str>) -> StoreResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        // The service token bypasses row level security; the anon key is the fallback bearer.
        let bearer = if self.service_token.is_empty() {
            &self.anon_key
        } else {
            &self.service_token
        };

        headers.insert("apikey", header_value(&self.anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(prefer) = prefer {
            headers.insert("Prefer", header_value(prefer)?);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> StoreResult<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> StoreResult<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(prefer)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await
            .map_err(|e| StoreError::Backend(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                404 => StoreError::not_found("resource", path),
                409 => StoreError::Conflict(error_text),
                401 | 403 => StoreError::Backend(format!("Authentication error: {}", error_text)),
                _ => StoreError::Backend(format!("API error ({}): {}", status, error_text)),
            });
        }

        response.json::<T>().await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn header_value(raw: &str) -> StoreResult<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|e| StoreError::Backend(format!("Invalid header value: {}", e)))
}

fn timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// `SchedulingStore` over PostgREST. The uniqueness rules live in the database (unique indexes,
/// including a partial one on active appointments) and surface here as HTTP 409.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(SupabaseClient::new(config))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, filters: &str) -> StoreResult<Vec<T>> {
        let path = if filters.is_empty() {
            format!("/rest/v1/{}?select=*", table)
        } else {
            format!("/rest/v1/{}?select=*&{}", table, filters)
        };
        self.client.request(Method::GET, &path, None).await
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, filters: &str) -> StoreResult<Option<T>> {
        let rows: Vec<T> = self.select(table, &format!("{}&limit=1", filters)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<T: Serialize>(&self, table: &str, record: &T) -> StoreResult<Vec<Value>> {
        let body = serde_json::to_value(record)?;
        self.client.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(body),
            Some(RETURN_REPRESENTATION),
        ).await
    }

    async fn patch(&self, table: &str, filters: &str, body: Value) -> StoreResult<Vec<Value>> {
        self.client.request_with_headers(
            Method::PATCH,
            &format!("/rest/v1/{}?{}", table, filters),
            Some(body),
            Some(RETURN_REPRESENTATION),
        ).await
    }

    async fn delete(&self, table: &str, filters: &str) -> StoreResult<Vec<Value>> {
        self.client.request_with_headers(
            Method::DELETE,
            &format!("/rest/v1/{}?{}", table, filters),
            None,
            Some(RETURN_REPRESENTATION),
        ).await
    }
}

fn appointment_filters(query: &AppointmentQuery) -> String {
    let mut filters = Vec::new();

    if let Some(doctor_id) = query.doctor_id {
        filters.push(format!("doctor_id=eq.{}", doctor_id));
    }
    if let Some(patient_id) = query.patient_id {
        filters.push(format!("patient_id=eq.{}", patient_id));
    }
    if let Some(status) = query.status {
        filters.push(format!("status=eq.{}", status));
    }
    if let Some(status) = query.exclude_status {
        filters.push(format!("status=neq.{}", status));
    }
    if let Some(from) = query.from {
        filters.push(format!("appointment_date=gte.{}", timestamp(from)));
    }
    if let Some(until) = query.until {
        filters.push(format!("appointment_date=lt.{}", timestamp(until)));
    }
    filters.push("order=appointment_date.asc".to_string());

    filters.join("&")
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn list_specialties(&self) -> StoreResult<Vec<Specialty>> {
        self.select("specialties", "order=name.asc").await
    }

    async fn find_specialty(&self, id: Uuid) -> StoreResult<Option<Specialty>> {
        self.select_one("specialties", &format!("id=eq.{}", id)).await
    }

    async fn insert_specialty(&self, specialty: &Specialty) -> StoreResult<()> {
        self.insert("specialties", specialty).await.map(|_| ())
    }

    async fn list_doctors(&self, query: &DoctorQuery) -> StoreResult<Vec<Doctor>> {
        let mut filters = Vec::new();
        if let Some(specialty_id) = query.specialty_id {
            filters.push(format!("specialty_id=eq.{}", specialty_id));
        }
        if let Some(ids) = &query.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            filters.push(format!("id=in.({})", ids.join(",")));
        }
        filters.push("order=last_name.asc".to_string());

        // Name matching spans "first last", which PostgREST filters cannot express directly.
        let doctors: Vec<Doctor> = self.select("doctors", &filters.join("&")).await?;
        Ok(doctors.into_iter()
            .filter(|d| query.matches(d))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn find_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        self.select_one("doctors", &format!("id=eq.{}", id)).await
    }

    async fn find_doctor_by_email(&self, email: &str) -> StoreResult<Option<Doctor>> {
        self.select_one("doctors", &format!("email=eq.{}", urlencoding::encode(email))).await
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        self.insert("doctors", doctor).await.map(|_| ())
    }

    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let rows = self.patch("doctors", &format!("id=eq.{}", doctor.id), serde_json::to_value(doctor)?).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("doctor", doctor.id));
        }
        Ok(())
    }

    async fn delete_doctor(&self, id: Uuid) -> StoreResult<()> {
        let by_doctor = format!("doctor_id=eq.{}", id);
        self.delete("favorite_doctors", &by_doctor).await?;
        self.delete("reviews", &by_doctor).await?;
        self.delete("appointments", &by_doctor).await?;
        self.delete("doctor_availability", &by_doctor).await?;

        let rows = self.delete("doctors", &format!("id=eq.{}", id)).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("doctor", id));
        }
        Ok(())
    }

    async fn save_doctor_rating(&self, doctor_id: Uuid, rating: f64, review_count: i32) -> StoreResult<()> {
        let rows = self.patch(
            "doctors",
            &format!("id=eq.{}", doctor_id),
            json!({ "rating": rating, "review_count": review_count }),
        ).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("doctor", doctor_id));
        }
        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        self.select_one("patients", &format!("id=eq.{}", id)).await
    }

    async fn find_patient_by_email(&self, email: &str) -> StoreResult<Option<Patient>> {
        self.select_one("patients", &format!("email=eq.{}", urlencoding::encode(email))).await
    }

    async fn create_patient(&self, patient: NewPatient) -> StoreResult<Patient> {
        let created = Patient {
            id: Uuid::new_v4(),
            first_name: patient.first_name,
            last_name: patient.last_name,
            email: patient.email,
            phone: patient.phone,
        };
        self.insert("patients", &created).await?;
        Ok(created)
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        self.select("patients", "order=last_name.asc").await
    }

    async fn list_availability(
        &self,
        doctor_id: Uuid,
        day_of_week: Option<i32>,
    ) -> StoreResult<Vec<WeeklyAvailability>> {
        let mut filters = format!("doctor_id=eq.{}", doctor_id);
        if let Some(day) = day_of_week {
            filters.push_str(&format!("&day_of_week=eq.{}", day));
        }
        filters.push_str("&order=day_of_week.asc,start_time.asc");
        self.select("doctor_availability", &filters).await
    }

    async fn save_availability(&self, entry: &WeeklyAvailability) -> StoreResult<()> {
        let body = serde_json::to_value(entry)?;
        let _: Vec<Value> = self.client.request_with_headers(
            Method::POST,
            "/rest/v1/doctor_availability?on_conflict=id",
            Some(body),
            Some(UPSERT),
        ).await?;
        Ok(())
    }

    async fn find_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        self.select_one("appointments", &format!("id=eq.{}", id)).await
    }

    async fn list_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        self.select("appointments", &appointment_filters(query)).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        self.insert("appointments", appointment).await.map(|_| ())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let rows = self.patch(
            "appointments",
            &format!("id=eq.{}", appointment.id),
            serde_json::to_value(appointment)?,
        ).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("appointment", appointment.id));
        }
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()> {
        self.delete("reviews", &format!("appointment_id=eq.{}", id)).await?;
        let rows = self.delete("appointments", &format!("id=eq.{}", id)).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("appointment", id));
        }
        Ok(())
    }

    async fn list_reviews(&self, doctor_id: Uuid) -> StoreResult<Vec<Review>> {
        self.select("reviews", &format!("doctor_id=eq.{}&order=created_at.desc", doctor_id)).await
    }

    async fn find_review_by_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Review>> {
        self.select_one("reviews", &format!("appointment_id=eq.{}", appointment_id)).await
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        self.insert("reviews", review).await.map(|_| ())
    }

    async fn count_reviews(&self) -> StoreResult<usize> {
        let rows: Vec<Value> = self.client.request(Method::GET, "/rest/v1/reviews?select=id", None).await?;
        Ok(rows.len())
    }

    async fn list_favorites(&self, patient_id: Uuid) -> StoreResult<Vec<FavoriteDoctor>> {
        self.select("favorite_doctors", &format!("patient_id=eq.{}", patient_id)).await
    }

    async fn find_favorite(&self, patient_id: Uuid, doctor_id: Uuid) -> StoreResult<Option<FavoriteDoctor>> {
        self.select_one(
            "favorite_doctors",
            &format!("patient_id=eq.{}&doctor_id=eq.{}", patient_id, doctor_id),
        ).await
    }

    async fn insert_favorite(&self, favorite: &FavoriteDoctor) -> StoreResult<()> {
        self.insert("favorite_doctors", favorite).await.map(|_| ())
    }

    async fn delete_favorite(&self, id: Uuid) -> StoreResult<()> {
        let rows = self.delete("favorite_doctors", &format!("id=eq.{}", id)).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found("favorite", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::scheduling::AppointmentStatus;

    #[test]
    fn test_appointment_filters_encode_half_open_range() {
        let doctor_id = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2099, 1, 5).unwrap();
        let query = AppointmentQuery::for_doctor(doctor_id)
            .between(day.and_hms_opt(0, 0, 0).unwrap(), day.and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(1))
            .excluding_status(AppointmentStatus::Cancelled);

        assert_eq!(
            appointment_filters(&query),
            format!(
                "doctor_id=eq.{}&status=neq.cancelled&appointment_date=gte.2099-01-05T00:00:00&appointment_date=lt.2099-01-06T00:00:00&order=appointment_date.asc",
                doctor_id
            )
        );
    }
}
