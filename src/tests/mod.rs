// Test modules for Chatsync
// Each module covers the corresponding source module

mod helpers;
