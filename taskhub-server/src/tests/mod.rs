mod access_flow_tests;
