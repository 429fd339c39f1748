//! Master-data lifecycle operations.
//!
//! Customers, vendors, product types and users are deactivated rather than
//! deleted, so past orders keep resolving. These operations are RBAC-gated
//! like order mutations but write no order-ledger entries; the ledger
//! records order history only.

use common::{CustomerId, ProductTypeId, VendorId};

use domain::{
    Action, Actor, Customer, ProductType, Role, User, Vendor, authorize,
};
use store::ShopStore;

use crate::error::ServiceError;
use crate::service::ShopService;

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Input for creating a vendor.
#[derive(Debug, Clone)]
pub struct CreateVendorInput {
    pub name: String,
    pub phone: Option<String>,
}

/// Input for creating a user account. The password digest arrives already
/// hashed; the core never sees a plaintext password.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub display_name: String,
    pub password_digest: String,
    pub role: Role,
}

impl<S: ShopStore> ShopService<S> {
    /// Creates a customer. Employees may manage customers.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_customer(
        &self,
        input: CreateCustomerInput,
        actor: &Actor,
    ) -> Result<Customer, ServiceError> {
        authorize(actor, Action::ManageCustomers)?;
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }

        let customer = Customer::new(input.name, input.phone, input.email);
        self.store().insert_customer(&customer).await?;
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    /// Activates or deactivates a customer.
    #[tracing::instrument(skip(self))]
    pub async fn set_customer_active(
        &self,
        id: &CustomerId,
        active: bool,
        actor: &Actor,
    ) -> Result<Customer, ServiceError> {
        authorize(actor, Action::ManageCustomers)?;
        self.store()
            .set_customer_active(id, active)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer {id} not found")))
    }

    /// Lists all customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        Ok(self.store().list_customers().await?)
    }

    /// Creates a vendor. Owner only.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_vendor(
        &self,
        input: CreateVendorInput,
        actor: &Actor,
    ) -> Result<Vendor, ServiceError> {
        authorize(actor, Action::ManageVendors)?;
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }

        let vendor = Vendor::new(input.name, input.phone);
        self.store().insert_vendor(&vendor).await?;
        tracing::info!(vendor_id = %vendor.id, "vendor created");
        Ok(vendor)
    }

    /// Activates or deactivates a vendor. Owner only.
    #[tracing::instrument(skip(self))]
    pub async fn set_vendor_active(
        &self,
        id: &VendorId,
        active: bool,
        actor: &Actor,
    ) -> Result<Vendor, ServiceError> {
        authorize(actor, Action::ManageVendors)?;
        self.store()
            .set_vendor_active(id, active)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("vendor {id} not found")))
    }

    /// Lists all vendors.
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, ServiceError> {
        Ok(self.store().list_vendors().await?)
    }

    /// Creates a product type. Owner only.
    #[tracing::instrument(skip(self))]
    pub async fn create_product_type(
        &self,
        name: String,
        actor: &Actor,
    ) -> Result<ProductType, ServiceError> {
        authorize(actor, Action::ManageProductTypes)?;
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }

        let product_type = ProductType::new(name);
        self.store().insert_product_type(&product_type).await?;
        tracing::info!(product_type_id = %product_type.id, "product type created");
        Ok(product_type)
    }

    /// Activates or deactivates a product type. Owner only.
    #[tracing::instrument(skip(self))]
    pub async fn set_product_type_active(
        &self,
        id: &ProductTypeId,
        active: bool,
        actor: &Actor,
    ) -> Result<ProductType, ServiceError> {
        authorize(actor, Action::ManageProductTypes)?;
        self.store()
            .set_product_type_active(id, active)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product type {id} not found")))
    }

    /// Lists all product types.
    pub async fn list_product_types(&self) -> Result<Vec<ProductType>, ServiceError> {
        Ok(self.store().list_product_types().await?)
    }

    /// Creates a user account. Owner only.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_user(
        &self,
        input: CreateUserInput,
        actor: &Actor,
    ) -> Result<User, ServiceError> {
        authorize(actor, Action::ManageUsers)?;
        if input.username.trim().is_empty() {
            return Err(ServiceError::Validation("username is required".to_string()));
        }
        if self
            .store()
            .get_user_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "username {:?} is already taken",
                input.username
            )));
        }

        let user = User::new(
            input.username,
            input.display_name,
            input.password_digest,
            input.role,
        );
        self.store().insert_user(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Lists all user accounts.
    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store().list_users().await?)
    }
}
