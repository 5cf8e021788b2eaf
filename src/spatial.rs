use crate::error::*;
use crate::role::*;
use crate::session::*;
use const_format::concatcp;
use std::num::NonZeroU32;

macro_rules! geography {
    ($table:expr, $index:expr) => {
        [
            concatcp!(
                "ALTER TABLE ", $table, " ",
                "ADD COLUMN IF NOT EXISTS geog geography(POINT, ", crate::SRID, ")"
            ),
            concatcp!(
                "UPDATE ", $table, " ",
                "SET    geog = ST_SetSRID(ST_MakePoint(long, lat), ", crate::SRID, ")::geography"
            ),
            concatcp!(
                "CREATE INDEX IF NOT EXISTS ", $index, " ",
                "ON ", $table, " USING GIST (geog)"
            ),
        ]
    };
}

/// Geography column, its fill and its GiST index for `role`'s table.
pub fn geography(role: Role) -> [&'static str; 3] {
    match role {
        Role::Prepare => geography!(TABLE_PREPARE, INDEX_PREPARE),
        Role::Ready => geography!(TABLE_READY, INDEX_READY),
    }
}

/// Nearest neighbors by Euclidean distance in raw degrees.
///
/// Fast and geodetically wrong: a degree of longitude shrinks towards the
/// poles. Scans the whole live table.
pub fn planar(neighbors: NonZeroU32) -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {f}(current_long DOUBLE PRECISION, current_lat DOUBLE PRECISION)
         RETURNS TABLE(objectid INTEGER, pcd2 TEXT, distance DOUBLE PRECISION) AS $$
         BEGIN
             RETURN QUERY
             SELECT   c.objectid,
                      c.pcd2,
                      SQRT(POWER(current_long - c.long::DOUBLE PRECISION, 2)
                         + POWER(current_lat  - c.lat::DOUBLE PRECISION,  2))
             FROM     {t} c
             WHERE    c.long IS NOT NULL
             AND      c.lat  IS NOT NULL
             ORDER BY 3, 1
             LIMIT    {n};
         END;
         $$ LANGUAGE plpgsql STABLE",
        f = FUNCTION_PLANAR,
        t = TABLE_READY,
        n = neighbors,
    )
}

/// Nearest neighbors by geodesic distance in kilometers, ordered by the
/// index-assisted `<->` operator on the live table's geography column.
pub fn geodesic(neighbors: NonZeroU32) -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {f}(current_long DOUBLE PRECISION, current_lat DOUBLE PRECISION)
         RETURNS TABLE(objectid INTEGER, pcd2 TEXT, distance_km DOUBLE PRECISION) AS $$
         DECLARE
             here geography := ST_SetSRID(ST_MakePoint(current_long, current_lat), {srid})::geography;
         BEGIN
             RETURN QUERY
             SELECT   c.objectid,
                      c.pcd2,
                      ST_Distance(c.geog, here) / 1000.0
             FROM     {t} c
             WHERE    c.geog IS NOT NULL
             ORDER BY c.geog <-> here
             LIMIT    {n};
         END;
         $$ LANGUAGE plpgsql STABLE",
        f = FUNCTION_GEO,
        t = TABLE_READY,
        srid = crate::SRID,
        n = neighbors,
    )
}

/// Spatial provisioning of a role table.
///
/// Attaches the geography column and its role-scoped index to `role`'s
/// table, then (re)installs both query functions. The functions always read
/// the live table by its role name, so whichever physical table is promoted
/// next is what they query. Everything is idempotent and runs in one
/// transaction.
///
/// The live table is never rewritten in place: it already carries the
/// geography it was promoted with, so for [`Role::Ready`] only a missing
/// index is rebuilt before the functions are reinstalled.
#[async_trait::async_trait]
pub trait Spatial: Session {
    async fn provision(&self, role: Role, neighbors: NonZeroU32) -> Result<()> {
        log::info!(
            "provisioning spatial index on {} ({} neighbors)",
            role,
            neighbors
        );
        let planar = planar(neighbors);
        let geodesic = geodesic(neighbors);
        let [column, fill, index] = geography(role);
        let mut statements: Vec<&str> = match role {
            Role::Prepare => vec![column, fill, index],
            Role::Ready => vec![index],
        };
        statements.push(&planar);
        statements.push(&geodesic);
        atomically(self, &statements).await.map_err(|fault| {
            log::error!("provisioning {} rolled back: {}", role, fault);
            Error::ddl("provisioning", fault)
        })?;
        log::info!("installed {} and {}", FUNCTION_PLANAR, FUNCTION_GEO);
        Ok(())
    }
}

impl<S> Spatial for S where S: Session {}
