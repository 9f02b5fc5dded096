diesel::table! {
    producto (id_producto) {
        id_producto -> Varchar,
        descripcion -> Varchar,
        humedad -> Nullable<Float8>,
        fermentacion -> Nullable<Float8>,
    }
}

diesel::table! {
    bodega (id_bodega) {
        id_bodega -> Varchar,
        codigo -> Varchar,
    }
}

diesel::table! {
    inventario (id_inventario) {
        id_inventario -> Uuid,
        fecha_entrada -> Date,
        fecha_salida -> Nullable<Date>,
        id_producto -> Varchar,
        id_bodega -> Varchar,
    }
}

// Read-only joined projection maintained by the migration.
diesel::table! {
    vista_inventario_completo (id_inventario) {
        id_inventario -> Uuid,
        fecha_entrada -> Date,
        fecha_salida -> Nullable<Date>,
        id_producto -> Varchar,
        producto_descripcion -> Varchar,
        humedad -> Nullable<Float8>,
        fermentacion -> Nullable<Float8>,
        id_bodega -> Varchar,
        bodega_codigo -> Varchar,
    }
}

diesel::joinable!(inventario -> producto (id_producto));
diesel::joinable!(inventario -> bodega (id_bodega));

diesel::allow_tables_to_appear_in_same_query!(producto, bodega, inventario);

diesel::sql_function! {
    /// Store-side removal. Returns the removed row's id, or NULL if no row
    /// matched.
    fn eliminar_inventario(p_id: diesel::sql_types::Uuid) -> diesel::sql_types::Nullable<diesel::sql_types::Uuid>;
}
