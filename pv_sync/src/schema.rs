//! Diesel table definitions for the local store.

#![allow(missing_docs)]

diesel::table! {
    pv_status (id) {
        id -> Nullable<Integer>,
        pv_system_id -> BigInt,
        ts -> Text,
        cumulative_energy_wh -> Nullable<Double>,
        energy_efficiency_kwh_per_kw -> Nullable<Double>,
        instantaneous_power_w -> Nullable<Double>,
        average_power_w -> Nullable<Double>,
        power_normalised -> Nullable<Double>,
        energy_consumption_wh -> Nullable<Double>,
        power_demand_w -> Nullable<Double>,
        temperature_c -> Nullable<Double>,
        voltage -> Nullable<Double>,
        query_date -> Text,
        requested_at -> Text,
    }
}

diesel::table! {
    missing_dates (pv_system_id, missing_date) {
        pv_system_id -> BigInt,
        missing_date -> Text,
        requested_at -> Text,
    }
}

diesel::table! {
    pv_statistics (pv_system_id) {
        pv_system_id -> BigInt,
        actual_date_from -> Nullable<Text>,
        actual_date_to -> Nullable<Text>,
        num_outputs -> BigInt,
        query_date_from -> Nullable<Text>,
        query_date_to -> Text,
        requested_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(pv_status, missing_dates, pv_statistics);
