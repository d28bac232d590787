#[macro_use]
extern crate rocket;

pub mod routes;
pub mod store;

use store::PostStore;

/// Build the Rocket instance against any store implementation.
/// Integration tests mount this directly with an in-memory store.
pub fn create_rocket(store: Box<dyn PostStore>) -> rocket::Rocket<rocket::Build> {
    let cors = rocket_cors::CorsOptions::default()
        .allowed_origins(rocket_cors::AllowedOrigins::all())
        .to_cors()
        .expect("CORS config");

    rocket::build()
        .manage(store)
        .attach(cors)
        .mount("/", routes![
            routes::health,
            routes::list_posts,
            routes::get_post,
            routes::create_post,
            routes::update_post,
            routes::delete_post,
        ])
        .register("/", catchers![
            routes::not_found,
            routes::unprocessable_entity,
            routes::internal_error,
        ])
}
