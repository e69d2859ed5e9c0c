pub mod mock_test;
