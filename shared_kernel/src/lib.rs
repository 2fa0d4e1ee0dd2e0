pub mod configuration;
pub mod http_client;
pub mod ids;
pub mod non_empty_string;
pub mod tracing;

pub mod region_name {
    use crate::string_key;

    string_key!(RegionName);
}

pub mod recipient_id {
    use crate::int_key;

    int_key!(RecipientId);
}
