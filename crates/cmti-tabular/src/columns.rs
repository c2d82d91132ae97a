//! Canonical worksheet column names.
//!
//! The worksheet is the one wide-table layout every source is mapped onto
//! before hydration and the layout every export produces.

// ─── Identity ────────────────────────────────────────────────────────────────

pub const SITE_NAME: &str = "Site_Name";
pub const SITE_TYPE: &str = "Site_Type";
pub const CMTI_ID: &str = "CMTI_ID";
pub const SITE_ALIASES: &str = "Site_Aliases";
pub const PARENT: &str = "Parent";
pub const PARENT_ID: &str = "Parent_ID";

// ─── Location ────────────────────────────────────────────────────────────────

pub const LAST_REVISED: &str = "Last_Revised";
pub const DATUM: &str = "Datum";
pub const UTM_ZONE: &str = "UTM_Zone";
pub const EASTING: &str = "Easting";
pub const NORTHING: &str = "Northing";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const COUNTRY: &str = "Country";
pub const PROVINCE_TERRITORY: &str = "Province_Territory";
pub const NTS_AREA: &str = "NTS_Area";
pub const MINING_DISTRICT: &str = "Mining_District";

// ─── Mine ────────────────────────────────────────────────────────────────────

pub const MINE_TYPE: &str = "Mine_Type";
pub const MINING_METHOD: &str = "Mining_Method";
pub const MINE_STATUS: &str = "Mine_Status";
pub const OWNER_OPERATOR: &str = "Owner_Operator";
pub const PAST_OWNERS: &str = "Past_Owners";
pub const DEV_STAGE: &str = "Dev_Stage";
pub const DS_COMMENTS: &str = "DS_Comments";
pub const SITE_ACCESS: &str = "Site_Access";
pub const SA_COMMENTS: &str = "SA_Comments";
pub const SHAFT_DEPTH: &str = "Shaft_Depth";
pub const CONSTRUCTION_YEAR: &str = "Construction_Year";
pub const YEAR_OPENED: &str = "Year_Opened";
pub const YEAR_CLOSED: &str = "Year_Closed";
pub const RESERVES_RESOURCES: &str = "Reserves_Resources";
pub const SEDAR: &str = "SEDAR";
pub const NOTES: &str = "Notes";
pub const OREBODY_TYPE: &str = "Orebody_Type";
pub const OREBODY_CLASS: &str = "Orebody_Class";
pub const ORE_MINERALS: &str = "Ore_Minerals";
pub const OREBODY_TYPE_2: &str = "Orebody_Type_2";
pub const OREBODY_CLASS_2: &str = "Orebody_Class_2";
pub const PROCESSING_METHOD: &str = "Processing_Method";
pub const ORE_PROCESSED: &str = "Ore_Processed";
pub const ORE_PROCESSED_UNIT: &str = "Ore_Processed_Unit";

// ─── Facility ────────────────────────────────────────────────────────────────

pub const HAZARD_CLASS: &str = "Hazard_Class";
pub const HAZARD_SYSTEM: &str = "Hazard_System";
pub const NOAMI_STATUS: &str = "NOAMI_Status";
pub const NOAMI_SITE_CLASS: &str = "NOAMI_Site_Class";
pub const PRP_RATING: &str = "PRP_Rating";
pub const REHAB_PLAN: &str = "Rehab_Plan";
pub const EWS: &str = "EWS";
pub const EWS_RATING: &str = "EWS_Rating";

// ─── Impoundment ─────────────────────────────────────────────────────────────

pub const TAILINGS_AREA: &str = "Tailings_Area";
pub const TAILINGS_AREA_FROM_IMAGES: &str = "Tailings_Area_From_Images";
pub const TAILINGS_AREA_NOTES: &str = "Tailings_Area_Notes";
pub const TAILINGS_VOLUME: &str = "Tailings_Volume";
pub const TAILINGS_CAPACITY: &str = "Tailings_Capacity";
pub const CURRENT_MAX_HEIGHT: &str = "Current_Max_Height";
pub const TAILINGS_STORAGE_METHOD: &str = "Tailings_Storage_Method";
pub const RAISE_TYPE: &str = "Raise_Type";
pub const ACID_GENERATING: &str = "Acid_Generating";
pub const TREATMENT: &str = "Treatment";
pub const RATING_INDEX: &str = "Rating_Index";
pub const STABILITY_CONCERNS: &str = "History_Stability_Concerns";

// ─── Slots ───────────────────────────────────────────────────────────────────

/// Commodity slots carried by one row.
pub const COMMODITY_SLOTS: usize = 8;

/// Reference slots carried by one row.
pub const SOURCE_SLOTS: usize = 4;

/// Orebodies carried by one row.
pub const OREBODY_SLOTS: usize = 2;

/// Sentinel some sources write instead of leaving a cell empty.
pub const UNKNOWN: &str = "Unknown";

pub const CANADA: &str = "Canada";

/// Site type labels as written in the `Site_Type` column.
pub const SITE_TYPE_MINE: &str = "Mine";
pub const SITE_TYPE_TSF: &str = "TSF";
pub const SITE_TYPE_IMPOUNDMENT: &str = "Impoundment";

pub fn commodity(slot: usize) -> String { format!("Commodity{slot}") }

pub fn source(slot: usize) -> String { format!("Source_{slot}") }

pub fn source_id(slot: usize) -> String { format!("Source_{slot}_ID") }

pub fn source_link(slot: usize) -> String { format!("Source_{slot}_Link") }

/// Type, class and minerals columns of orebody `slot`. The first slot uses
/// the bare names, later ones a `_{slot}` suffix.
pub fn orebody(slot: usize) -> [String; 3] {
  [OREBODY_TYPE, OREBODY_CLASS, ORE_MINERALS].map(|column| match slot {
    1 => column.to_owned(),
    n => format!("{column}_{n}"),
  })
}

pub fn grade(symbol: &str) -> String { format!("{symbol}_Grade") }

pub fn produced(symbol: &str) -> String { format!("{symbol}_Produced") }

pub fn contained(symbol: &str) -> String { format!("{symbol}_Contained") }

/// Canonical unit for produced/contained quantities of `symbol`.
///
/// Precious metals are tracked in troy ounces, everything else in kg.
pub fn quantity_unit(symbol: &str) -> &'static str {
  match symbol {
    "Au" | "Ag" => "oz",
    _ => "kg",
  }
}

/// Commodities with quantity columns declared on the worksheet.
pub const QUANTIFIED_COMMODITIES: &[&str] = &[
  "Au", "Ag", "Barite", "Bi", "Cd", "Co", "Cu", "Fe", "Fluorspar", "Graphite",
  "Gypsum", "In", "Mo", "Ni", "Pb", "Pd", "Potash", "Pt", "Sb", "Sn", "U", "W",
  "Zn",
];

// ─── Inheritance ─────────────────────────────────────────────────────────────

/// Columns a facility or impoundment row takes from its mine when unset.
pub const INHERITED_FROM_MINE: &[&str] = &[
  LAST_REVISED,
  DATUM,
  UTM_ZONE,
  EASTING,
  NORTHING,
  LATITUDE,
  LONGITUDE,
  COUNTRY,
  PROVINCE_TERRITORY,
  NTS_AREA,
  MINING_DISTRICT,
  MINE_TYPE,
  MINING_METHOD,
  MINE_STATUS,
  DEV_STAGE,
  SITE_ACCESS,
];

/// Facility-level columns an impoundment row takes from its facility.
pub const INHERITED_FROM_FACILITY: &[&str] = &[
  HAZARD_CLASS,
  HAZARD_SYSTEM,
  NOAMI_STATUS,
  NOAMI_SITE_CLASS,
  PRP_RATING,
  REHAB_PLAN,
  EWS,
  EWS_RATING,
];
