use serde::Deserialize;

use crate::db::addresses::{AddressRepository, AddressRow};
use crate::domain::value_objects::Status;
use crate::error::{AppError, ResultExt};
use crate::security::CurrentUser;
use crate::services::required;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub location: Option<String>,
}

impl AddressRequest {
    fn fields(&self) -> Result<(&str, &str, &str), AppError> {
        Ok((
            required(&self.receiver_name, "Receiver name must be not null")?,
            required(&self.receiver_phone, "Receiver phone must be not null")?,
            required(&self.location, "Location must be not null")?,
        ))
    }
}

/// Deleted addresses and other users' addresses are invisible.
fn usable_by(address: &AddressRow, user_id: i64) -> bool {
    address.user_id == user_id && address.status.is_active()
}

pub struct AddressService<'a> { state: &'a AppState }

impl<'a> AddressService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn addresses(&self) -> AddressRepository<'a> { AddressRepository::new(self.state.db()) }

    /// The address when it is active and the caller owns it.
    async fn owned(&self, current: &CurrentUser, id: i64) -> Result<AddressRow, AppError> {
        self.addresses()
            .find(id)
            .await?
            .filter(|a| usable_by(a, current.id))
            .ok_or_else(|| AppError::not_found("Shipping address not found"))
    }

    pub async fn get(&self, current: &CurrentUser) -> Result<Vec<AddressRow>, AppError> {
        Ok(self.addresses().list_active(current.id).await?)
    }

    pub async fn add(&self, current: &CurrentUser, req: &AddressRequest) -> Result<AddressRow, AppError> {
        let (name, phone, location) = req.fields()?;
        let row = self.addresses().create(current.id, name, phone, location).await.or_system("Error when add shipping address")?;
        tracing::info!(address_id = row.id, user_id = current.id, "Shipping address added");
        Ok(row)
    }

    pub async fn update(&self, current: &CurrentUser, id: i64, req: &AddressRequest) -> Result<AddressRow, AppError> {
        let (name, phone, location) = req.fields()?;
        self.owned(current, id).await?;
        self.addresses().update(id, name, phone, location).await.or_system("Error when update shipping address")
    }

    pub async fn delete(&self, current: &CurrentUser, id: i64) -> Result<(), AppError> {
        self.owned(current, id).await?;
        self.addresses().set_status(id, Status::Inactive).await.or_system("Error when delete shipping address")?;
        tracing::info!(address_id = id, user_id = current.id, "Shipping address deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_is_required() {
        let req = AddressRequest {
            receiver_name: Some("Lan".into()),
            receiver_phone: Some("0901234567".into()),
            location: Some("12 Nguyen Trai, Ha Noi".into()),
        };
        assert_eq!(req.fields().unwrap(), ("Lan", "0901234567", "12 Nguyen Trai, Ha Noi"));

        let err = AddressRequest { location: Some(" ".into()), ..req.clone() }.fields().unwrap_err();
        assert_eq!(err.to_string(), "Location must be not null");
        let err = AddressRequest { receiver_phone: None, ..req }.fields().unwrap_err();
        assert_eq!(err.to_string(), "Receiver phone must be not null");
    }

    #[test]
    fn deleted_or_foreign_addresses_are_not_usable() {
        let address = AddressRow {
            id: 1,
            user_id: 7,
            receiver_name: "Lan".into(),
            receiver_phone: "0901234567".into(),
            location: "Ha Noi".into(),
            status: Status::Active,
        };
        assert!(usable_by(&address, 7));
        assert!(!usable_by(&address, 8));
        assert!(!usable_by(&AddressRow { status: Status::Inactive, ..address }, 7));
    }
}
