use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_trips::config::{DatabaseConfig, EnvironmentConfig};
use fleet_trips::database::DatabaseConnection;
use fleet_trips::repositories::{IncidentRepository, PgFleetStore};
use fleet_trips::routes::create_app;
use fleet_trips::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleet_trips=debug,tower_http=info")),
        )
        .init();

    info!("🚚 Fleet Trips - Ciclo de vida de viajes y kilometraje");
    info!("=====================================================");

    let config = EnvironmentConfig::from_env()?;
    info!(
        environment = %config.environment,
        max_manual_jump = config.mileage.max_manual_jump,
        enforce_jump_on_trip_end = config.mileage.enforce_jump_on_trip_end,
        "⚙️ Configuración cargada"
    );
    if config.is_development() && config.cors_origins.is_empty() {
        warn!("⚠️ CORS permisivo: sin CORS_ORIGINS configurados");
    }

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new(&DatabaseConfig::from_env()?).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(e);
        }
    };
    db_connection.run_migrations().await?;

    let pool = db_connection.pool().clone();
    let state = AppState::new(
        config.clone(),
        Arc::new(PgFleetStore::new(pool.clone())),
        Arc::new(IncidentRepository::new(pool)),
    );
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🌐 Servidor iniciando en {}", config.server_url());
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚦 Viajes:");
    info!("   POST /api/trips/start - Iniciar viaje");
    info!("   GET  /api/trips - Historial de viajes del conductor");
    info!("   GET  /api/trips/active - Viaje en curso");
    info!("   GET  /api/trips/:id - Obtener viaje");
    info!("   POST /api/trips/:id/end - Completar viaje");
    info!("   POST /api/trips/:id/cancel - Cancelar viaje");
    info!("📒 Kilometraje:");
    info!("   POST /api/vehicles/:id/mileage - Actualización manual");
    info!("   GET  /api/vehicles/:id/mileage - Historial del libro");
    info!("   POST /api/vehicles/:id/mileage/readings - Lectura de taller (gestión)");
    info!("   POST /api/vehicles/:id/mileage/reconcile - Reconciliar odómetro (gestión)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
