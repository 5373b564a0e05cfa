use serde::{Deserialize, Serialize};

use crate::models::Vaccine;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddVaccineRequest {
    pub name: String,
    pub administered_on: String,
    pub dose: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VaccineListResponse {
    pub vaccines: Vec<Vaccine>,
}
