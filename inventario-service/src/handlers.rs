use chrono::NaiveDate;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel::upsert::excluded;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;
use crate::schema::*;

type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("registro de inventario no encontrado")]
    NotFound,
    #[error(transparent)]
    Store(#[from] diesel::result::Error),
    #[error("error del pool de conexiones: {0}")]
    Pool(#[from] bb8::RunError<diesel_async::pooled_connection::PoolError>),
}

/// Datos para crear un registro de inventario. Producto y bodega se
/// reconcilian como efecto secundario (ver [`InventarioService::crear`]).
#[derive(Debug, Clone, Deserialize)]
pub struct CrearInventario {
    pub fecha_entrada: NaiveDate,
    pub fecha_salida: Option<NaiveDate>,
    pub id_producto: String,
    pub producto_descripcion: String,
    pub humedad: Option<f64>,
    pub fermentacion: Option<f64>,
    pub id_bodega: String,
    pub bodega_codigo: String,
}

/// Cambios parciales sobre un registro existente. Campo ausente = sin
/// cambio. `id_producto` e `id_bodega` se aceptan en el cuerpo pero el
/// registro nunca se re-apunta a otro producto u otra bodega.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActualizarInventario {
    pub fecha_entrada: Option<NaiveDate>,
    pub fecha_salida: Option<NaiveDate>,
    pub id_producto: Option<String>,
    pub producto_descripcion: Option<String>,
    pub humedad: Option<f64>,
    pub fermentacion: Option<f64>,
    pub id_bodega: Option<String>,
    pub bodega_codigo: Option<String>,
}

/// Upsert del producto por su clave natural: inserta, o sobrescribe
/// descripción y mediciones sin condiciones si la fila ya existe.
fn upsert_producto(
    nuevo: NuevoProducto,
) -> impl diesel_async::methods::ExecuteDsl<AsyncPgConnection> + QueryFragment<Pg> {
    diesel::insert_into(producto::table)
        .values(nuevo)
        .on_conflict(producto::id_producto)
        .do_update()
        .set((
            producto::descripcion.eq(excluded(producto::descripcion)),
            producto::humedad.eq(excluded(producto::humedad)),
            producto::fermentacion.eq(excluded(producto::fermentacion)),
        ))
}

/// Alta de bodega resuelta por `codigo`: si el código ya existe la fila
/// existente se conserva intacta y el id enviado se descarta.
fn insertar_bodega(
    nueva: NuevaBodega,
) -> impl diesel_async::methods::ExecuteDsl<AsyncPgConnection> + QueryFragment<Pg> {
    diesel::insert_into(bodega::table)
        .values(nueva)
        .on_conflict(bodega::codigo)
        .do_nothing()
}

/// Proyección de respuesta del alta: datos de entrada más el id generado y
/// el id de bodega resuelto, sin relectura del almacén.
fn proyeccion_creada(
    entrada: CrearInventario,
    id_inventario: Uuid,
    id_bodega: String,
) -> InventarioCompleto {
    InventarioCompleto {
        id_inventario,
        fecha_entrada: entrada.fecha_entrada,
        fecha_salida: entrada.fecha_salida,
        id_producto: entrada.id_producto,
        producto_descripcion: entrada.producto_descripcion,
        humedad: entrada.humedad,
        fermentacion: entrada.fermentacion,
        id_bodega,
        bodega_codigo: entrada.bodega_codigo,
    }
}

fn resultado_eliminacion(marcador: Option<Uuid>) -> Result<(), ServiceError> {
    match marcador {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound),
    }
}

pub struct InventarioService {
    pool: DbPool,
}

impl InventarioService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn listar(&self) -> Result<Vec<InventarioCompleto>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let items = vista_inventario_completo::table
            .order((
                vista_inventario_completo::fecha_entrada.desc(),
                vista_inventario_completo::id_inventario.asc(),
            ))
            .load::<InventarioCompleto>(&mut conn)
            .await?;
        Ok(items)
    }

    pub async fn obtener(&self, id: Uuid) -> Result<InventarioCompleto, ServiceError> {
        let mut conn = self.pool.get().await?;
        vista_inventario_completo::table
            .find(id)
            .first::<InventarioCompleto>(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn buscar(&self, termino: &str) -> Result<Vec<InventarioCompleto>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let patron = format!("%{}%", termino);
        let items = vista_inventario_completo::table
            .filter(
                vista_inventario_completo::producto_descripcion
                    .ilike(patron.clone())
                    .or(vista_inventario_completo::bodega_codigo.ilike(patron)),
            )
            .order((
                vista_inventario_completo::fecha_entrada.desc(),
                vista_inventario_completo::id_inventario.asc(),
            ))
            .load::<InventarioCompleto>(&mut conn)
            .await?;
        Ok(items)
    }

    /// Crea un registro de inventario reconciliando producto y bodega en una
    /// sola transacción:
    ///
    /// - producto: upsert por `id_producto`, sobrescribiendo descripción,
    ///   humedad y fermentación sin condiciones (sobrescritura completa).
    /// - bodega: upsert por `codigo`; si el código ya existe gana el
    ///   `id_bodega` de la fila existente y se descarta el enviado.
    ///
    /// La respuesta se construye con los datos de entrada más el id generado
    /// y el id de bodega resuelto, sin re-leer el almacén.
    pub async fn crear(&self, datos: CrearInventario) -> Result<InventarioCompleto, ServiceError> {
        let mut conn = self.pool.get().await?;
        let id_inventario = Uuid::new_v4();
        let entrada = datos.clone();

        let id_bodega = conn
            .transaction::<_, ServiceError, _>(|conn| {
                Box::pin(async move {
                    upsert_producto(NuevoProducto {
                        id_producto: datos.id_producto.clone(),
                        descripcion: datos.producto_descripcion.clone(),
                        humedad: datos.humedad,
                        fermentacion: datos.fermentacion,
                    })
                    .execute(conn)
                    .await?;

                    // La bodega se resuelve por código, no por id: si el
                    // código ya existe se conserva la fila existente y su id.
                    insertar_bodega(NuevaBodega {
                        id_bodega: datos.id_bodega.clone(),
                        codigo: datos.bodega_codigo.clone(),
                    })
                    .execute(conn)
                    .await?;

                    let id_bodega: String = bodega::table
                        .filter(bodega::codigo.eq(&datos.bodega_codigo))
                        .select(bodega::id_bodega)
                        .first(conn)
                        .await?;

                    diesel::insert_into(inventario::table)
                        .values(NuevoInventario {
                            id_inventario,
                            fecha_entrada: datos.fecha_entrada,
                            fecha_salida: datos.fecha_salida,
                            id_producto: datos.id_producto.clone(),
                            id_bodega: id_bodega.clone(),
                        })
                        .execute(conn)
                        .await?;

                    Ok(id_bodega)
                })
            })
            .await?;

        Ok(proyeccion_creada(entrada, id_inventario, id_bodega))
    }

    /// Aplica cambios parciales sobre el registro, su producto actual y su
    /// bodega actual. A diferencia de [`crear`](Self::crear), el producto se
    /// parcha solo en los campos enviados. Cambiar `bodega_codigo` muta la
    /// fila de bodega compartida, afectando a todo registro que la referencie.
    pub async fn actualizar(
        &self,
        id: Uuid,
        cambios: ActualizarInventario,
    ) -> Result<InventarioCompleto, ServiceError> {
        let mut conn = self.pool.get().await?;

        let item = conn
            .transaction::<_, ServiceError, _>(|conn| {
                Box::pin(async move {
                    let actual: Inventario = inventario::table
                        .find(id)
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(ServiceError::NotFound)?;

                    if let Some(fecha) = cambios.fecha_entrada {
                        diesel::update(inventario::table.find(id))
                            .set(inventario::fecha_entrada.eq(fecha))
                            .execute(conn)
                            .await?;
                    }
                    if let Some(fecha) = cambios.fecha_salida {
                        diesel::update(inventario::table.find(id))
                            .set(inventario::fecha_salida.eq(fecha))
                            .execute(conn)
                            .await?;
                    }

                    let patch = ProductoPatch {
                        descripcion: cambios.producto_descripcion,
                        humedad: cambios.humedad,
                        fermentacion: cambios.fermentacion,
                    };
                    if !patch.is_empty() {
                        diesel::update(producto::table.find(&actual.id_producto))
                            .set(&patch)
                            .execute(conn)
                            .await?;
                    }

                    if let Some(codigo) = cambios.bodega_codigo {
                        diesel::update(bodega::table.find(&actual.id_bodega))
                            .set(bodega::codigo.eq(codigo))
                            .execute(conn)
                            .await?;
                    }

                    // Relectura dentro de la misma transacción: la respuesta
                    // siempre refleja el estado que se va a confirmar.
                    vista_inventario_completo::table
                        .find(id)
                        .first::<InventarioCompleto>(conn)
                        .await
                        .optional()?
                        .ok_or(ServiceError::NotFound)
                })
            })
            .await?;

        Ok(item)
    }

    /// Delega el borrado a la función del almacén; un marcador no nulo
    /// indica que hubo fila eliminada.
    pub async fn eliminar(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.pool.get().await?;
        let eliminado: Option<Uuid> = diesel::select(eliminar_inventario(id))
            .get_result(&mut conn)
            .await?;
        resultado_eliminacion(eliminado)
    }

    pub async fn listar_productos(&self) -> Result<Vec<ProductoResumen>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let items = producto::table
            .select((producto::id_producto, producto::descripcion))
            .order(producto::descripcion.asc())
            .load::<ProductoResumen>(&mut conn)
            .await?;
        Ok(items)
    }

    pub async fn listar_bodegas(&self) -> Result<Vec<BodegaResumen>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let items = bodega::table
            .select((bodega::id_bodega, bodega::codigo))
            .order(bodega::codigo.asc())
            .load::<BodegaResumen>(&mut conn)
            .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datos_de_alta() -> CrearInventario {
        serde_json::from_str(
            r#"{
                "fecha_entrada": "2026-01-15",
                "id_producto": "P1",
                "producto_descripcion": "Cacao nacional",
                "humedad": 7.5,
                "fermentacion": 4.0,
                "id_bodega": "B-NUEVA",
                "bodega_codigo": "W1"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn upsert_de_producto_sobrescribe_en_conflicto() {
        let sql = diesel::debug_query::<Pg, _>(&upsert_producto(NuevoProducto {
            id_producto: "P1".to_string(),
            descripcion: "Cacao nacional".to_string(),
            humedad: Some(7.5),
            fermentacion: Some(4.0),
        }))
        .to_string();

        assert!(
            sql.contains(r#"ON CONFLICT ("id_producto") DO UPDATE"#),
            "{}",
            sql
        );
        assert!(sql.contains(r#""descripcion" = excluded."descripcion""#), "{}", sql);
        assert!(sql.contains(r#""humedad" = excluded."humedad""#), "{}", sql);
        assert!(
            sql.contains(r#""fermentacion" = excluded."fermentacion""#),
            "{}",
            sql
        );
    }

    #[test]
    fn alta_de_bodega_no_toca_la_fila_existente() {
        let sql = diesel::debug_query::<Pg, _>(&insertar_bodega(NuevaBodega {
            id_bodega: "B-NUEVA".to_string(),
            codigo: "W1".to_string(),
        }))
        .to_string();

        assert!(sql.contains(r#"INSERT INTO "bodega""#), "{}", sql);
        assert!(sql.contains(r#"ON CONFLICT ("codigo") DO NOTHING"#), "{}", sql);
    }

    #[test]
    fn proyeccion_creada_usa_el_id_de_bodega_resuelto() {
        // El código W1 ya existía: gana el id de la fila existente y el
        // id_bodega enviado en el cuerpo se descarta.
        let datos = datos_de_alta();
        let id = Uuid::new_v4();
        let item = proyeccion_creada(datos.clone(), id, "B-EXISTENTE".to_string());

        assert_eq!(item.id_inventario, id);
        assert_eq!(item.id_bodega, "B-EXISTENTE");
        assert_eq!(item.bodega_codigo, "W1");
        assert_eq!(item.id_producto, datos.id_producto);
        assert_eq!(item.producto_descripcion, datos.producto_descripcion);
        assert_eq!(item.humedad, datos.humedad);
        assert_eq!(item.fermentacion, datos.fermentacion);
        assert_eq!(item.fecha_entrada, datos.fecha_entrada);
        assert!(item.fecha_salida.is_none());
    }

    #[test]
    fn proyeccion_creada_conserva_el_id_enviado_si_la_bodega_es_nueva() {
        let datos = datos_de_alta();
        let id_enviado = datos.id_bodega.clone();
        let item = proyeccion_creada(datos, Uuid::new_v4(), id_enviado.clone());
        assert_eq!(item.id_bodega, id_enviado);
    }

    #[test]
    fn eliminacion_sin_marcador_es_no_encontrado() {
        assert!(matches!(
            resultado_eliminacion(None),
            Err(ServiceError::NotFound)
        ));
        assert!(resultado_eliminacion(Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn actualizar_deserializa_campos_ausentes_como_none() {
        let cambios: ActualizarInventario = serde_json::from_str(r#"{"humedad": 55.0}"#).unwrap();
        assert_eq!(cambios.humedad, Some(55.0));
        assert!(cambios.fecha_entrada.is_none());
        assert!(cambios.producto_descripcion.is_none());
        assert!(cambios.fermentacion.is_none());
        assert!(cambios.bodega_codigo.is_none());
    }

    #[test]
    fn actualizar_acepta_ids_aunque_no_se_usen() {
        let cambios: ActualizarInventario =
            serde_json::from_str(r#"{"id_producto": "P9", "id_bodega": "B9"}"#).unwrap();
        assert_eq!(cambios.id_producto.as_deref(), Some("P9"));
        assert_eq!(cambios.id_bodega.as_deref(), Some("B9"));
    }

    #[test]
    fn crear_requiere_campos_obligatorios() {
        let resultado: Result<CrearInventario, _> =
            serde_json::from_str(r#"{"fecha_entrada": "2026-01-15"}"#);
        assert!(resultado.is_err());
    }

    #[test]
    fn crear_admite_mediciones_nulas() {
        let datos: CrearInventario = serde_json::from_str(
            r#"{
                "fecha_entrada": "2026-01-15",
                "id_producto": "P1",
                "producto_descripcion": "Cacao fino",
                "id_bodega": "B1",
                "bodega_codigo": "W1"
            }"#,
        )
        .unwrap();
        assert!(datos.humedad.is_none());
        assert!(datos.fermentacion.is_none());
        assert!(datos.fecha_salida.is_none());
    }

    #[test]
    fn patch_de_producto_solo_con_campos_enviados() {
        let cambios: ActualizarInventario = serde_json::from_str(r#"{"humedad": 55.0}"#).unwrap();
        let patch = ProductoPatch {
            descripcion: cambios.producto_descripcion,
            humedad: cambios.humedad,
            fermentacion: cambios.fermentacion,
        };
        assert!(!patch.is_empty());
        assert_eq!(patch.humedad, Some(55.0));
        assert!(patch.descripcion.is_none());
        assert!(patch.fermentacion.is_none());

        let vacio: ActualizarInventario =
            serde_json::from_str(r#"{"fecha_entrada": "2026-02-01"}"#).unwrap();
        let patch = ProductoPatch {
            descripcion: vacio.producto_descripcion,
            humedad: vacio.humedad,
            fermentacion: vacio.fermentacion,
        };
        assert!(patch.is_empty());
    }
}
