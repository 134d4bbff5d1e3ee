diesel::table! {
    command_queue (id) {
        id -> Integer,
        imei -> Text,
        command -> Text,            // setdigout 1 <secs> | setdigout 0
        status -> Text,             // pending | sent | acknowledged | failed
        created_at -> Timestamp,
    }
}

diesel::table! {
    dout1_state (imei) {
        imei -> Text,
        dout1_active -> Bool,
        deactivate_time -> Nullable<Timestamp>,   // set iff dout1_active
    }
}

diesel::table! {
    server_settings (id) {
        id -> Integer,
        strict_device_existence -> Bool,
        dedup_commands -> Bool,
        default_ttl_seconds -> BigInt,
        sweep_interval_seconds -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(command_queue, dout1_state, server_settings,);
