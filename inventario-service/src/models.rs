use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::inventario)]
#[diesel(primary_key(id_inventario))]
pub struct Inventario {
    pub id_inventario: Uuid,
    pub fecha_entrada: NaiveDate,
    pub fecha_salida: Option<NaiveDate>,
    pub id_producto: String,
    pub id_bodega: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inventario)]
pub struct NuevoInventario {
    pub id_inventario: Uuid,
    pub fecha_entrada: NaiveDate,
    pub fecha_salida: Option<NaiveDate>,
    pub id_producto: String,
    pub id_bodega: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::producto)]
pub struct NuevoProducto {
    pub id_producto: String,
    pub descripcion: String,
    pub humedad: Option<f64>,
    pub fermentacion: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bodega)]
pub struct NuevaBodega {
    pub id_bodega: String,
    pub codigo: String,
}

/// Partial patch for a producto row. `None` fields are left untouched by
/// diesel's changeset, which is what the update path wants.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::producto)]
pub struct ProductoPatch {
    pub descripcion: Option<String>,
    pub humedad: Option<f64>,
    pub fermentacion: Option<f64>,
}

impl ProductoPatch {
    /// Diesel rejects an all-`None` changeset at runtime, so callers must
    /// skip the update entirely when nothing was supplied.
    pub fn is_empty(&self) -> bool {
        self.descripcion.is_none() && self.humedad.is_none() && self.fermentacion.is_none()
    }
}

/// One row of `vista_inventario_completo`, serialized with the exact field
/// names the original frontend consumes.
#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct InventarioCompleto {
    pub id_inventario: Uuid,
    pub fecha_entrada: NaiveDate,
    pub fecha_salida: Option<NaiveDate>,
    pub id_producto: String,
    pub producto_descripcion: String,
    pub humedad: Option<f64>,
    pub fermentacion: Option<f64>,
    pub id_bodega: String,
    pub bodega_codigo: String,
}

#[derive(Debug, Clone, Queryable, Serialize)]
pub struct ProductoResumen {
    pub id_producto: String,
    pub descripcion: String,
}

#[derive(Debug, Clone, Queryable, Serialize)]
pub struct BodegaResumen {
    pub id_bodega: String,
    pub codigo: String,
}
