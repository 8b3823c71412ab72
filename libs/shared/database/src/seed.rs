// libs/shared/database/src/seed.rs
use chrono::NaiveTime;
use tracing::info;
use uuid::Uuid;

use shared_models::scheduling::{ConsultationType, Doctor, Specialty, WeeklyAvailability};

use crate::store::{SchedulingStore, StoreError, StoreResult};

const SPECIALTIES: [(&str, &str); 8] = [
    ("Cardiology", "Heart and cardiovascular system"),
    ("Dermatology", "Skin, hair, and nail conditions"),
    ("Pediatrics", "Medical care for infants, children, and adolescents"),
    ("Orthopedics", "Musculoskeletal system and injuries"),
    ("Neurology", "Brain, spine, and nervous system disorders"),
    ("General Medicine", "Primary healthcare and general checkups"),
    ("Ophthalmology", "Eye care and vision health"),
    ("Dentistry", "Oral health and dental care"),
];

struct SampleDoctor {
    first_name: &'static str,
    last_name: &'static str,
    email: &'static str,
    phone: &'static str,
    bio: &'static str,
    wait_time: i32,
    consultation_types: &'static str,
    years_experience: i32,
}

// One doctor per specialty, in specialty order.
const DOCTORS: [SampleDoctor; 8] = [
    SampleDoctor {
        first_name: "Sarah", last_name: "Johnson", email: "sarah.johnson@clinic.com", phone: "555-0101",
        bio: "Board-certified cardiologist with 15 years of experience in interventional cardiology. Specializes in heart rhythm disorders and heart failure management.",
        wait_time: 10, consultation_types: "in-person,video", years_experience: 15,
    },
    SampleDoctor {
        first_name: "Michael", last_name: "Chen", email: "michael.chen@clinic.com", phone: "555-0102",
        bio: "Expert in cosmetic dermatology and skin cancer treatment. Board certified with advanced training in laser procedures and Mohs surgery.",
        wait_time: 20, consultation_types: "in-person,video,phone", years_experience: 12,
    },
    SampleDoctor {
        first_name: "Emily", last_name: "Williams", email: "emily.williams@clinic.com", phone: "555-0103",
        bio: "Compassionate pediatrician specializing in child development and preventive care. Dedicated to providing family-centered healthcare.",
        wait_time: 5, consultation_types: "in-person,video,phone", years_experience: 8,
    },
    SampleDoctor {
        first_name: "David", last_name: "Brown", email: "david.brown@clinic.com", phone: "555-0104",
        bio: "Orthopedic surgeon specializing in sports medicine and joint replacement. Former team physician for professional sports teams.",
        wait_time: 15, consultation_types: "in-person", years_experience: 20,
    },
    SampleDoctor {
        first_name: "Lisa", last_name: "Anderson", email: "lisa.anderson@clinic.com", phone: "555-0105",
        bio: "Neurologist with expertise in headache disorders and epilepsy. Conducts cutting-edge research in neurological treatments.",
        wait_time: 25, consultation_types: "in-person,video", years_experience: 14,
    },
    SampleDoctor {
        first_name: "James", last_name: "Wilson", email: "james.wilson@clinic.com", phone: "555-0106",
        bio: "Family medicine physician focused on preventive care and chronic disease management. Emphasizes holistic patient wellness.",
        wait_time: 8, consultation_types: "in-person,video,phone", years_experience: 10,
    },
    SampleDoctor {
        first_name: "Maria", last_name: "Garcia", email: "maria.garcia@clinic.com", phone: "555-0107",
        bio: "Ophthalmologist specializing in cataract surgery and glaucoma treatment. State-of-the-art facility with latest diagnostic technology.",
        wait_time: 12, consultation_types: "in-person", years_experience: 18,
    },
    SampleDoctor {
        first_name: "Robert", last_name: "Taylor", email: "robert.taylor@clinic.com", phone: "555-0108",
        bio: "Experienced dentist providing comprehensive dental care including cosmetic dentistry, implants, and orthodontics.",
        wait_time: 5, consultation_types: "in-person", years_experience: 16,
    },
];

/// Monday to Friday, 09:00 to 17:00. Given to seeded and newly created doctors.
pub fn default_weekly_availability(doctor_id: Uuid) -> Vec<WeeklyAvailability> {
    let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);

    (0..5)
        .map(|day| WeeklyAvailability {
            id: Uuid::new_v4(),
            doctor_id,
            day_of_week: day,
            start_time: open,
            end_time: close,
            is_available: true,
        })
        .collect()
}

#[derive(Debug, Default, PartialEq)]
pub struct SeedSummary {
    pub specialties: usize,
    pub doctors: usize,
}

/// Loads the sample catalogue. Does nothing when specialties already exist.
pub async fn seed_sample_data(store: &dyn SchedulingStore) -> StoreResult<SeedSummary> {
    if !store.list_specialties().await?.is_empty() {
        info!("Specialties already present, skipping sample data");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();

    for ((name, description), sample) in SPECIALTIES.iter().zip(DOCTORS.iter()) {
        let specialty = Specialty {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some(description.to_string()),
        };
        store.insert_specialty(&specialty).await?;
        summary.specialties += 1;

        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name: sample.first_name.to_string(),
            last_name: sample.last_name.to_string(),
            specialty_id: specialty.id,
            email: sample.email.to_string(),
            phone: Some(sample.phone.to_string()),
            bio: Some(sample.bio.to_string()),
            image_url: None,
            rating: 0.0,
            review_count: 0,
            estimated_wait_time: sample.wait_time,
            consultation_types: ConsultationType::parse_list(sample.consultation_types)
                .map_err(StoreError::Decode)?,
            is_verified: true,
            years_experience: sample.years_experience,
        };
        store.insert_doctor(&doctor).await?;

        for entry in default_weekly_availability(doctor.id) {
            store.save_availability(&entry).await?;
        }
        summary.doctors += 1;
    }

    info!("Seeded {} specialties and {} doctors", summary.specialties, summary.doctors);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::store::DoctorQuery;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = InMemoryStore::new();

        let first = seed_sample_data(&store).await.unwrap();
        assert_eq!(first, SeedSummary { specialties: 8, doctors: 8 });

        let second = seed_sample_data(&store).await.unwrap();
        assert_eq!(second, SeedSummary::default());
        assert_eq!(store.list_doctors(&DoctorQuery::default()).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_seeded_doctors_work_weekdays() {
        let store = InMemoryStore::new();
        seed_sample_data(&store).await.unwrap();

        let doctors = store.list_doctors(&DoctorQuery::named("johnson")).await.unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(
            doctors[0].consultation_types,
            vec![ConsultationType::InPerson, ConsultationType::Video]
        );

        let schedule = store.list_availability(doctors[0].id, None).await.unwrap();
        let days: Vec<i32> = schedule.iter().map(|a| a.day_of_week).collect();
        assert_eq!(days, vec![0, 1, 2, 3, 4]);
    }
}
