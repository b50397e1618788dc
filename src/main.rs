use std::{error::Error, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use derive_more::From;
use serde::Deserialize;
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use parkwise::{
    allocator::SpotRepository,
    api, db,
    service::{self, ParkingService, TicketRepository},
    Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let db_client = Arc::new(db_client);
    let parking = ParkingService::new(
        Arc::clone(&db_client) as Arc<dyn SpotRepository>,
        Arc::clone(&db_client) as Arc<dyn TicketRepository>,
        config.fare,
    );

    let app = Router::new()
        .route("/vehicle/entry", post(vehicle_entry))
        .route("/vehicle/exit", post(vehicle_exit))
        .route("/ticket/:vehicle_id", get(get_ticket))
        .layer(cors)
        .with_state(Arc::new(AppState { db_client, parking }));

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleEntryInput {
    vehicle_id: String,
    category: api::spot::Category,
}

async fn vehicle_entry(
    State(state): State<SharedAppState>,
    Json(VehicleEntryInput {
        vehicle_id,
        category,
    }): Json<VehicleEntryInput>,
) -> Result<Json<api::ticket::Created>, VehicleEntryError> {
    let created = state.parking.process_entry(&vehicle_id, category).await?;

    Ok(Json(api::ticket::Created {
        ticket: created.ticket.into(),
        previous_visits: created.previous_visits,
    }))
}

#[derive(Debug, From)]
enum VehicleEntryError {
    #[from]
    Entry(service::EntryError),
}

impl IntoResponse for VehicleEntryError {
    fn into_response(self) -> Response {
        use service::EntryError as E;

        let Self::Entry(e) = self;
        match e {
            E::EmptyVehicleId => {
                (StatusCode::BAD_REQUEST, "vehicle id must not be empty")
            }
            E::AlreadyParked => {
                (StatusCode::CONFLICT, "vehicle is already parked")
            }
            E::LotFull => (
                StatusCode::CONFLICT,
                "no spot of the requested category is available",
            ),
            E::Storage(e) => {
                tracing::error!("entry failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
            }
        }
        .into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleExitInput {
    vehicle_id: String,
}

async fn vehicle_exit(
    State(state): State<SharedAppState>,
    Json(VehicleExitInput { vehicle_id }): Json<VehicleExitInput>,
) -> Result<Json<api::ticket::Closed>, VehicleExitError> {
    let closed = state.parking.process_exit(&vehicle_id).await?;

    Ok(Json(api::ticket::Closed {
        ticket: closed.ticket.into(),
        hours: closed.hours,
        minutes: closed.minutes,
    }))
}

#[derive(Debug, From)]
enum VehicleExitError {
    #[from]
    Exit(service::ExitError),
}

impl IntoResponse for VehicleExitError {
    fn into_response(self) -> Response {
        use service::ExitError as E;

        let Self::Exit(e) = self;
        match e {
            E::EmptyVehicleId => {
                (StatusCode::BAD_REQUEST, "vehicle id must not be empty")
            }
            E::TicketNotFound => {
                (StatusCode::NOT_FOUND, "no ticket for this vehicle")
            }
            E::NotCurrentlyParked => {
                (StatusCode::CONFLICT, "vehicle is not currently parked")
            }
            E::Fare(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "recorded times do not form a valid interval",
            ),
            E::Storage(e) => {
                tracing::error!("exit failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
            }
        }
        .into_response()
    }
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<api::Ticket>, GetTicketError> {
    use GetTicketError as E;

    let ticket = state
        .db_client
        .most_recent_ticket(&vehicle_id)
        .await?
        .ok_or(E::TicketNotFound)?;

    Ok(Json(ticket.into()))
}

#[derive(Debug, From)]
enum GetTicketError {
    #[from]
    Storage(db::StorageError),
    TicketNotFound,
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Storage(e) => {
                tracing::error!("ticket lookup failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: Arc<db::Client>,

    parking: ParkingService,
}
