//! Simulated health intelligence for a city.
//!
//! Seeded by city and calendar date, so a city's answer is stable for the
//! day but differs across cities and days.

use chrono::NaiveDate;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::HealthIntelligence;

const CONDITIONS: &[&str] = &[
    "Seasonal Viral Fever",
    "Dengue",
    "Malaria",
    "Typhoid",
    "Respiratory Infection",
    "Gastroenteritis",
    "Conjunctivitis",
    "Chikungunya",
    "Pollen Allergy",
];

const MEDICINES: &[&str] = &[
    "Azithromycin 500mg",
    "Dolo 650",
    "ORS Packets",
    "Cetirizine",
    "Amoxicillin",
    "Oflomac-OZ",
    "Montelukast",
    "Levo-Cetirizine",
    "Paracetamol IV",
    "Ibuprofen",
];

/// FNV-1a over `city-YYYY-MM-DD`. The hash is platform independent; the
/// picks drawn from it are only repeatable for a given `rand` version.
fn seed_for(city: &str, date: NaiveDate) -> u64 {
    // ---
    let key = format!("{}-{}", city, date.format("%Y-%m-%d"));
    key.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

pub fn simulated_health(city: &str, date: NaiveDate) -> HealthIntelligence {
    // ---
    let mut rng = StdRng::seed_from_u64(seed_for(city, date));

    let pick = |pool: &[&str], rng: &mut StdRng| -> Vec<String> {
        pool.choose_multiple(rng, 3).map(|s| s.to_string()).collect()
    };
    let prevalent_diseases = pick(CONDITIONS, &mut rng);
    let high_demand_medicines = pick(MEDICINES, &mut rng);

    let health_alert = format!(
        "Increased reports of {} in {}. Monitor hydration and hygiene.",
        prevalent_diseases[0], city
    );

    HealthIntelligence {
        prevalent_diseases,
        health_alert,
        high_demand_medicines,
    }
}
