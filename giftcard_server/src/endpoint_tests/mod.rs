mod admin;
mod health;
mod helpers;
mod mocks;
mod orders;
mod webhook;
