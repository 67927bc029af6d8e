//! Static catalog lookups and the daily-rate price table for car bookings.

/// Daily rate applied to any brand missing from the price table.
pub const DEFAULT_BASE_PRICE: u32 = 60;

const CAR_BRANDS: &[&str] = &[
    "Toyota",
    "Honda",
    "BMW",
    "Mercedes",
    "Audi",
    "Volkswagen",
    "Hyundai",
    "Kia",
    "Nissan",
    "Ford",
    "Chevrolet",
    "Tesla",
    "Mazda",
    "Subaru",
    "Mitsubishi",
    "Jaguar",
    "Land Rover",
    "Volvo",
];

const ACCRA_LOCATIONS: &[&str] = &[
    "Accra Mall",
    "Kotoka International Airport",
    "University of Ghana",
    "Labone Beach",
    "Osu Oxford Street",
    "Aburi Botanical Gardens",
    "Independence Square",
    "Kwame Nkrumah Memorial Park",
    "Art Centre",
    "Makola Market",
    "Tema Port",
    "Ashongman Estate",
    "East Legon",
    "Airport Residential Area",
    "Cantonments",
    "Dzorwulu",
    "Labone",
];

const CAR_MODELS: &[(&str, &[&str])] = &[
    ("Toyota", &["Camry", "Corolla", "RAV4", "Highlander", "Prius", "Yaris"]),
    ("Honda", &["Accord", "Civic", "CR-V", "Pilot", "Fit", "HR-V"]),
    ("BMW", &["3 Series", "5 Series", "X3", "X5", "7 Series", "2 Series"]),
    ("Mercedes", &["C-Class", "E-Class", "GLC", "GLE", "S-Class", "A-Class"]),
    ("Audi", &["A4", "A6", "Q5", "Q7", "A3", "Q3"]),
    ("Tesla", &["Model 3", "Model S", "Model X", "Model Y"]),
    ("Hyundai", &["Elantra", "Santa Fe", "Tucson", "Sonata", "Kona", "Palisade"]),
    ("Kia", &["Optima", "Sorento", "Sportage", "Forte", "Telluride", "Soul"]),
];

const BASE_PRICES: &[(&str, u32)] = &[
    ("Toyota", 50),
    ("Honda", 55),
    ("BMW", 120),
    ("Mercedes", 130),
    ("Audi", 115),
    ("Tesla", 150),
    ("Hyundai", 45),
    ("Kia", 40),
];

pub fn car_brands() -> &'static [&'static str] {
    CAR_BRANDS
}

pub fn accra_locations() -> &'static [&'static str] {
    ACCRA_LOCATIONS
}

/// Models offered for `brand`; empty for brands without a model list.
/// Brand lookup is case-sensitive.
pub fn car_models(brand: &str) -> &'static [&'static str] {
    CAR_MODELS
        .iter()
        .find(|(b, _)| *b == brand)
        .map(|(_, models)| *models)
        .unwrap_or(&[])
}

pub fn base_daily_price(brand: &str) -> u32 {
    BASE_PRICES
        .iter()
        .find(|(b, _)| *b == brand)
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_BASE_PRICE)
}

/// Total price of a booking. The model does not affect the rate.
pub fn booking_price(brand: &str, _model: &str, days: u32) -> u64 {
    u64::from(base_daily_price(brand)) * u64::from(days)
}
