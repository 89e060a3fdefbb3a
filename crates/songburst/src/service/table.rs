//! Attribute table of the song burst service

use std::sync::Arc;

use super::config::SongServiceConfig;
use crate::att::AttPermissions;
use crate::gatt::{AttributeTable, CharacteristicProperties, SubscriptionTable};

pub const DATA_USER_DESCRIPTION: &str = "Song Data";
pub const CONFIG_USER_DESCRIPTION: &str = "Song Conf.";

/// Service declaration, the notifying read-only data characteristic with its
/// CCCD, then the read/write config characteristic.
pub(crate) fn build_attribute_table(
    config: &SongServiceConfig,
    subscriptions: Arc<SubscriptionTable>,
) -> AttributeTable {
    let mut table =
        AttributeTable::primary_service(config.service_uuid(), config.encryption_key_size);

    table
        .add_characteristic(
            config.data_uuid(),
            CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
            AttPermissions::read_only(),
        )
        .add_cccd(subscriptions);
    if config.user_descriptions {
        table.add_user_description(DATA_USER_DESCRIPTION);
    }

    table.add_characteristic(
        config.config_uuid(),
        CharacteristicProperties::READ | CharacteristicProperties::WRITE,
        AttPermissions::read_write(),
    );
    if config.user_descriptions {
        table.add_user_description(CONFIG_USER_DESCRIPTION);
    }

    table
}
